//! Response mode decision table.

use super::{Intent, ResponseMode, Sufficiency};

/// Decides how the answer is framed.
///
/// | Intent | Sufficiency | Mode |
/// |--------|-------------|------|
/// | MEMORY | NOT_ENOUGH | WORLD |
/// | MEMORY | ENOUGH / NOT_NEEDED | HYBRID |
/// | WORLD | any | WORLD |
/// | HYBRID | any | HYBRID |
#[must_use]
pub const fn resolve_mode(intent: Intent, sufficiency: Sufficiency) -> ResponseMode {
    match (intent, sufficiency) {
        (Intent::Memory, Sufficiency::NotEnough) | (Intent::World, _) => ResponseMode::World,
        (Intent::Memory | Intent::Hybrid, _) => ResponseMode::Hybrid,
    }
}

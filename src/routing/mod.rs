//! Intent routing.
//!
//! Decides what a question needs ([`Intent`]), whether retrieved memories
//! cover it ([`Sufficiency`]), and from those the [`ResponseMode`].

mod classifier;
mod mode;
mod types;

pub use classifier::{IntentRouter, memory_digest};
pub use mode::resolve_mode;
pub use types::{Intent, ResponseMode, Sufficiency};

//! Tagged result for stages that have a defined fallback.

/// Result of a stage that may fall back to a default.
///
/// | Variant | Meaning |
/// |---------|---------|
/// | `Ok` | The stage fully succeeded |
/// | `Degraded` | A fallback value was used; `reason` says why |
/// | `Failed` | No usable value exists |
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Fully succeeded.
    Ok(T),
    /// Fallback value in use.
    Degraded {
        /// The fallback value.
        value: T,
        /// Why the fallback was used.
        reason: String,
    },
    /// Nothing usable.
    Failed(String),
}

impl<T> Outcome<T> {
    /// Creates a degraded outcome.
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self::Degraded {
            value,
            reason: reason.into(),
        }
    }

    /// Returns the value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Ok(value) | Self::Degraded { value, .. } => Some(value),
            Self::Failed(_) => None,
        }
    }

    /// Consumes the outcome, returning the value if any.
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Ok(value) | Self::Degraded { value, .. } => Some(value),
            Self::Failed(_) => None,
        }
    }

    /// Returns the fallback or failure reason.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Ok(_) => None,
            Self::Degraded { reason, .. } | Self::Failed(reason) => Some(reason),
        }
    }

    /// Whether the stage fully succeeded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Whether a fallback value is in use.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Whether no value is available.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Maps the carried value, preserving the tag.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Ok(value) => Outcome::Ok(f(value)),
            Self::Degraded { value, reason } => Outcome::Degraded {
                value: f(value),
                reason,
            },
            Self::Failed(reason) => Outcome::Failed(reason),
        }
    }
}

impl<T: Copy> Outcome<T> {
    /// Returns the value or `default` when failed.
    #[must_use]
    pub fn value_or(&self, default: T) -> T {
        self.value().copied().unwrap_or(default)
    }
}

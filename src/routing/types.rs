//! Routing labels.

use std::fmt;

/// What kind of knowledge a question needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// Personal details already saved as memories.
    Memory,
    /// General world knowledge.
    World,
    /// Ideas or plans combining saved preferences with world knowledge.
    Hybrid,
}

impl Intent {
    /// All intents.
    pub const ALL: [Self; 3] = [Self::Memory, Self::World, Self::Hybrid];

    /// Parses a classifier label; surrounding whitespace and case are ignored.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "MEMORY" => Some(Self::Memory),
            "WORLD" => Some(Self::World),
            "HYBRID" => Some(Self::Hybrid),
            _ => None,
        }
    }

    /// Returns the label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "MEMORY",
            Self::World => "WORLD",
            Self::Hybrid => "HYBRID",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether retrieved memories answer the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sufficiency {
    /// The memories suffice.
    Enough,
    /// They do not, or nothing was retrieved.
    NotEnough,
    /// No check was made because the question needs no memories.
    NotNeeded,
}

impl Sufficiency {
    /// All sufficiency values.
    pub const ALL: [Self; 3] = [Self::Enough, Self::NotEnough, Self::NotNeeded];

    /// Parses a classifier verdict. Only `ENOUGH` and `NOT_ENOUGH` can come
    /// from the classifier.
    #[must_use]
    pub fn parse(verdict: &str) -> Option<Self> {
        match verdict.trim().to_uppercase().as_str() {
            "ENOUGH" => Some(Self::Enough),
            "NOT_ENOUGH" => Some(Self::NotEnough),
            _ => None,
        }
    }

    /// Returns the label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Enough => "ENOUGH",
            Self::NotEnough => "NOT_ENOUGH",
            Self::NotNeeded => "NOT_NEEDED",
        }
    }
}

impl fmt::Display for Sufficiency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the answer is framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseMode {
    /// Lead with general knowledge.
    World,
    /// Weave memories in, then supplement.
    Hybrid,
}

impl ResponseMode {
    /// Returns the label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::World => "WORLD",
            Self::Hybrid => "HYBRID",
        }
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

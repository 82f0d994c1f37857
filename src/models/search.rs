//! Ranking types.

use super::MemoryRecord;

/// How the user asked memories to be ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Token overlap scoring.
    #[default]
    Keyword,
    /// Embedding similarity, falling back to keyword on failure.
    Semantic,
}

impl SearchMode {
    /// Returns the mode as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Semantic => "semantic",
        }
    }

    /// Builds the mode from a "semantic requested" flag.
    #[must_use]
    pub const fn from_semantic_flag(semantic: bool) -> Self {
        if semantic { Self::Semantic } else { Self::Keyword }
    }
}

/// A memory with the score it was ranked by.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    /// The ranked memory.
    pub memory: MemoryRecord,
    /// Keyword hit count or cosine similarity, depending on the ranker.
    pub score: f32,
}

impl RankedCandidate {
    /// Creates a ranked candidate.
    #[must_use]
    pub const fn new(memory: MemoryRecord, score: f32) -> Self {
        Self { memory, score }
    }
}

/// Strips scores, keeping order.
#[must_use]
pub fn into_memories(candidates: Vec<RankedCandidate>) -> Vec<MemoryRecord> {
    candidates.into_iter().map(|c| c.memory).collect()
}

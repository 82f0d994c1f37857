//! Memory ranking.
//!
//! The rankers are pure functions over borrowed slices; they never mutate the
//! collection. [`HybridRetriever`] adds the semantic-with-fallback policy used
//! by chat, and [`browse`] the search-box policy.

pub mod browse;
mod hybrid;
mod keyword;
mod semantic;

pub use browse::{BrowseQuery, browse_keyword, browse_semantic};
pub use hybrid::HybridRetriever;
pub use keyword::{KeywordRanker, MIN_TOKEN_LEN, rank_keyword, sort_newest_first, tokenize};
pub use semantic::rank_semantic;

use crate::models::{MemoryRecord, RankedCandidate};

/// Default cap on memories retrieved for a question.
pub const DEFAULT_LIMIT: usize = 30;

/// How [`rank`] scores memories.
#[derive(Debug, Clone, PartialEq)]
pub enum RankingMode {
    /// Distinct query-token overlap.
    Keyword,
    /// Cosine similarity to the given query vector.
    Semantic(Vec<f32>),
}

/// Ranks memories for a query.
///
/// Keyword mode applies the [`DEFAULT_LIMIT`] and the recency fallback;
/// semantic mode returns every memory, most similar first.
#[must_use]
pub fn rank(query: &str, mode: &RankingMode, memories: &[MemoryRecord]) -> Vec<RankedCandidate> {
    match mode {
        RankingMode::Keyword => rank_keyword(query, memories, DEFAULT_LIMIT),
        RankingMode::Semantic(query_vector) => rank_semantic(query_vector, memories),
    }
}

//! Semantic retrieval with a keyword safety net.

use super::keyword::KeywordRanker;
use super::semantic::rank_semantic;
use crate::models::{MemoryId, MemoryRecord, Outcome, RankedCandidate, SearchMode};
use crate::services::MemoryStore;

/// Retrieves memories for a chat question.
///
/// Keyword ranking is the default. When semantic ranking is requested the
/// candidates' vectors and a query vector must both be obtained first; if
/// either fails the same query is ranked by keyword and the result is
/// [`Outcome::Degraded`].
#[derive(Clone)]
pub struct HybridRetriever {
    store: MemoryStore,
    keyword: KeywordRanker,
}

impl HybridRetriever {
    /// Creates a retriever over a store.
    #[must_use]
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            keyword: KeywordRanker::default(),
        }
    }

    /// Overrides the keyword ranker limits.
    #[must_use]
    pub const fn with_keyword_ranker(mut self, keyword: KeywordRanker) -> Self {
        self.keyword = keyword;
        self
    }

    /// Ranks the store's retrievable memories for `query`.
    #[must_use]
    pub fn retrieve(&self, query: &str, mode: SearchMode) -> Outcome<Vec<RankedCandidate>> {
        let candidates: Vec<MemoryRecord> = self
            .store
            .snapshot()
            .into_iter()
            .filter(MemoryRecord::is_retrievable)
            .collect();

        match mode {
            SearchMode::Keyword => Outcome::Ok(self.keyword.rank(query, &candidates)),
            SearchMode::Semantic => match self.rank_semantically(query, &candidates) {
                Ok(ranked) => Outcome::Ok(ranked),
                Err(e) => {
                    metrics::counter!("retrieval_fallbacks_total", "reason" => "embedding").increment(1);
                    tracing::warn!(error = %e, "Semantic retrieval failed, using keyword ranking");
                    Outcome::degraded(
                        self.keyword.rank(query, &candidates),
                        format!("semantic search unavailable, used keyword search: {e}"),
                    )
                },
            },
        }
    }

    fn rank_semantically(
        &self,
        query: &str,
        candidates: &[MemoryRecord],
    ) -> crate::Result<Vec<RankedCandidate>> {
        let ids: Vec<MemoryId> = candidates.iter().map(|m| m.id.clone()).collect();
        self.store.ensure_embeddings(&ids)?;
        let query_vector = self.store.embed_query(query)?;

        // Vectors were attached to the store, not to our copies.
        let refreshed: Vec<MemoryRecord> = self
            .store
            .snapshot()
            .into_iter()
            .filter(|m| m.is_retrievable() && ids.contains(&m.id))
            .collect();

        let mut ranked = rank_semantic(&query_vector, &refreshed);
        ranked.truncate(self.keyword.limit);
        Ok(ranked)
    }
}

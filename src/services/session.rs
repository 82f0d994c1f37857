//! Search-box browsing session.

use super::MemoryStore;
use super::supersede::{QuerySequencer, QueryTicket};
use crate::models::{MemoryId, MemoryRecord, SearchMode};
use crate::retrieval::{BrowseQuery, browse_keyword, browse_semantic};
use std::sync::Mutex;

/// Advisory shown while semantic browsing is unavailable.
pub const SEMANTIC_UNAVAILABLE: &str = "Semantic search unavailable right now, showing keyword matches instead.";

/// Browsing state for one search box.
///
/// Holds the degraded-search advisory, which stays set until the next
/// successful semantic search, and a [`QuerySequencer`] so a slow search
/// cannot overwrite a newer one. Each session is independent.
pub struct SearchSession {
    store: MemoryStore,
    advisory: Mutex<Option<String>>,
    sequencer: QuerySequencer,
}

impl SearchSession {
    /// Creates a session over a store.
    #[must_use]
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            advisory: Mutex::new(None),
            sequencer: QuerySequencer::new(),
        }
    }

    /// The current advisory, if semantic search last failed.
    #[must_use]
    pub fn advisory(&self) -> Option<String> {
        self.advisory
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn set_advisory(&self, advisory: Option<String>) {
        *self
            .advisory
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = advisory;
    }

    /// Starts a search, superseding any in flight.
    pub fn begin(&self) -> QueryTicket {
        self.sequencer.issue()
    }

    /// Runs a search for `ticket`. Returns `None` if a newer search started
    /// meanwhile.
    pub fn search_with_ticket(
        &self,
        ticket: QueryTicket,
        query: &BrowseQuery,
        mode: SearchMode,
    ) -> Option<Vec<MemoryRecord>> {
        let results = self.run(query, mode);
        self.sequencer.accept(ticket, results)
    }

    /// Runs a search to completion.
    pub fn search(&self, query: &BrowseQuery, mode: SearchMode) -> Vec<MemoryRecord> {
        self.run(query, mode)
    }

    fn run(&self, query: &BrowseQuery, mode: SearchMode) -> Vec<MemoryRecord> {
        let memories = self.store.snapshot();

        if query.trimmed_term().is_empty() || mode == SearchMode::Keyword {
            return browse_keyword(query, &memories);
        }

        let candidates = query.filter_category(&memories);
        let ids: Vec<MemoryId> = candidates.iter().map(|m| m.id.clone()).collect();

        let semantic = self
            .store
            .ensure_embeddings(&ids)
            .and_then(|_| self.store.embed_query(query.trimmed_term()));

        match semantic {
            Ok(query_vector) => {
                self.set_advisory(None);
                let refreshed: Vec<MemoryRecord> = self
                    .store
                    .snapshot()
                    .into_iter()
                    .filter(|m| ids.contains(&m.id))
                    .collect();
                browse_semantic(query, &query_vector, &refreshed)
            },
            Err(e) => {
                tracing::warn!(error = %e, "Semantic browse failed, using keyword filter");
                metrics::counter!("retrieval_fallbacks_total", "reason" => "browse").increment(1);
                self.set_advisory(Some(SEMANTIC_UNAVAILABLE.to_string()));
                browse_keyword(query, &memories)
            },
        }
    }
}

//! Browsing the collection from a search box.

use super::keyword::sort_newest_first;
use super::semantic::rank_semantic;
use crate::models::{Category, MemoryRecord, into_memories};

/// A browse request: optional category filter plus the search box text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowseQuery {
    /// Only show this category.
    pub category: Option<Category>,
    /// Search box contents.
    pub term: String,
}

impl BrowseQuery {
    /// Creates a query for a search term.
    #[must_use]
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            category: None,
            term: term.into(),
        }
    }

    /// Restricts to one category.
    #[must_use]
    pub const fn with_category(mut self, category: Option<Category>) -> Self {
        self.category = category;
        self
    }

    /// The trimmed search term.
    #[must_use]
    pub fn trimmed_term(&self) -> &str {
        self.term.trim()
    }

    /// Applies the category filter.
    #[must_use]
    pub fn filter_category(&self, memories: &[MemoryRecord]) -> Vec<MemoryRecord> {
        memories
            .iter()
            .filter(|m| self.category.is_none_or(|c| m.category == c))
            .cloned()
            .collect()
    }
}

/// Whether the whole term appears, case-insensitively, in the memory's text,
/// any tag, or its category.
#[must_use]
pub fn matches_term(memory: &MemoryRecord, term: &str) -> bool {
    let needle = term.to_lowercase();
    memory.text.to_lowercase().contains(&needle)
        || memory.tags.iter().any(|t| t.to_lowercase().contains(&needle))
        || memory.category.as_str().contains(&needle)
}

/// Keyword browse: substring filter, newest first. An empty term lists
/// everything newest first.
#[must_use]
pub fn browse_keyword(query: &BrowseQuery, memories: &[MemoryRecord]) -> Vec<MemoryRecord> {
    let term = query.trimmed_term();
    let mut filtered: Vec<MemoryRecord> = query
        .filter_category(memories)
        .into_iter()
        .filter(|m| term.is_empty() || matches_term(m, term))
        .collect();
    sort_newest_first(&mut filtered);
    filtered
}

/// Semantic browse: every candidate, most similar first.
#[must_use]
pub fn browse_semantic(
    query: &BrowseQuery,
    query_vector: &[f32],
    memories: &[MemoryRecord],
) -> Vec<MemoryRecord> {
    into_memories(rank_semantic(query_vector, &query.filter_category(memories)))
}

//! The in-memory memory collection.
//!
//! # Concurrency Model
//!
//! The collection sits behind an `Arc<RwLock<Vec<MemoryRecord>>>`, so clones
//! of a [`MemoryStore`] share state. Ranking works on snapshots; only the
//! store mutates records. Missing vectors are filled through the shared
//! [`EmbeddingCache`], which deduplicates concurrent requests per id.

use crate::embedding::{EmbeddingCache, EmbeddingRequest, Embedder};
use crate::models::{
    Category, MemoryId, MemoryRecord, Timestamp, dedupe_tags, is_valid_embedding,
};
use crate::{Error, Result};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared, thread-safe memory collection.
#[derive(Clone)]
pub struct MemoryStore {
    records: Arc<RwLock<Vec<MemoryRecord>>>,
    cache: Arc<EmbeddingCache>,
}

impl MemoryStore {
    /// Creates an empty store that embeds through `embedder`.
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self::with_cache(EmbeddingCache::new(embedder))
    }

    /// Creates an empty store over a configured cache.
    #[must_use]
    pub fn with_cache(cache: EmbeddingCache) -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
            cache: Arc::new(cache),
        }
    }

    /// Seeds the store with records.
    #[must_use]
    pub fn with_records(self, records: Vec<MemoryRecord>) -> Self {
        *self.write() = records;
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<MemoryRecord>> {
        self.records.read().unwrap_or_else(|poisoned| {
            tracing::warn!("Memory store lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<MemoryRecord>> {
        self.records.write().unwrap_or_else(|poisoned| {
            tracing::warn!("Memory store lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Adds a record, deduplicating its tags. Returns its id.
    pub fn add(&self, mut record: MemoryRecord) -> MemoryId {
        record.tags = dedupe_tags(std::mem::take(&mut record.tags));
        let id = record.id.clone();
        self.write().push(record);
        metrics::counter!("memories_added_total").increment(1);
        tracing::debug!(memory_id = %id, "Memory added");
        id
    }

    /// Edits a record in place, stamps it with the edit time, and drops its
    /// vector.
    ///
    /// The vector is recomputed the next time semantic ranking needs it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no record has this id.
    pub fn update(
        &self,
        id: &MemoryId,
        category: Category,
        text: impl Into<String>,
        tags: Vec<String>,
    ) -> Result<MemoryRecord> {
        let mut records = self.write();
        let record = records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| Error::InvalidInput(format!("memory not found: {id}")))?;

        record.category = category;
        record.text = text.into();
        record.tags = dedupe_tags(tags);
        record.created_at = Timestamp::now();
        record.clear_embedding();

        tracing::debug!(memory_id = %id, "Memory updated, embedding invalidated");
        Ok(record.clone())
    }

    /// Removes a record. Returns whether it existed.
    pub fn delete(&self, id: &MemoryId) -> bool {
        let mut records = self.write();
        let before = records.len();
        records.retain(|r| &r.id != id);
        let removed = records.len() < before;
        if removed {
            metrics::counter!("memories_deleted_total").increment(1);
        }
        removed
    }

    /// Replaces the whole collection (import).
    pub fn replace_all(&self, records: Vec<MemoryRecord>) {
        let count = records.len();
        *self.write() = records;
        tracing::info!(count, "Memory collection replaced");
    }

    /// Returns a copy of one record.
    #[must_use]
    pub fn get(&self, id: &MemoryId) -> Option<MemoryRecord> {
        self.read().iter().find(|r| &r.id == id).cloned()
    }

    /// Returns a copy of the whole collection in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<MemoryRecord> {
        self.read().clone()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Fills missing vectors for the given ids.
    ///
    /// Records that already hold a valid vector, or no longer exist, are
    /// skipped. A vector is only attached if the record's embedding input is
    /// unchanged since the request was made.
    ///
    /// Returns the number of vectors attached by this call.
    ///
    /// # Errors
    ///
    /// Returns the first failing batch. Vectors from earlier batches are kept.
    pub fn ensure_embeddings(&self, ids: &[MemoryId]) -> Result<usize> {
        let requests: Vec<EmbeddingRequest> = {
            let records = self.read();
            ids.iter()
                .filter_map(|id| records.iter().find(|r| &r.id == id))
                .filter(|r| !r.has_valid_embedding())
                .map(|r| EmbeddingRequest {
                    id: r.id.clone(),
                    input: r.embedding_input(),
                })
                .collect()
        };

        if requests.is_empty() {
            return Ok(0);
        }

        self.cache.resolve(
            requests,
            |id| {
                self.read()
                    .iter()
                    .any(|r| &r.id == id && !r.has_valid_embedding())
            },
            |id, input, vector, model| self.attach(id, input, vector, model),
        )
    }

    /// Fills missing vectors for every record.
    ///
    /// # Errors
    ///
    /// Returns the first failing batch.
    pub fn ensure_all_embeddings(&self) -> Result<usize> {
        let ids: Vec<MemoryId> = self.read().iter().map(|r| r.id.clone()).collect();
        self.ensure_embeddings(&ids)
    }

    /// Embeds a search query.
    ///
    /// # Errors
    ///
    /// Returns the embedder's error.
    pub fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.cache.embed_query(query)
    }

    fn attach(&self, id: &MemoryId, input: &str, vector: Vec<f32>, model: &str) -> bool {
        let mut records = self.write();
        let Some(record) = records.iter_mut().find(|r| &r.id == id) else {
            return false;
        };
        if record.embedding_input() != input {
            metrics::counter!("embedding_stale_discards_total").increment(1);
            tracing::debug!(memory_id = %id, "Discarding vector for edited memory");
            return false;
        }
        if !is_valid_embedding(&vector) {
            metrics::counter!("embedding_invalid_discards_total").increment(1);
            tracing::warn!(
                memory_id = %id,
                dimensions = vector.len(),
                "Discarding malformed vector"
            );
            return false;
        }
        record.embedding = Some(vector);
        record.embedding_model = Some(model.to_string());
        true
    }
}

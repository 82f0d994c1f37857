//! Batched, single-flight embedding resolution.
//!
//! # Concurrency Model
//!
//! Each memory id being embedded owns a [`Flight`] in the `pending` map. The
//! first caller to claim an id sends it to the embedder; later callers that
//! touch the same id wait on the flight's condvar and share its result. The
//! owner attaches vectors to the store *before* retiring the flight, so a
//! caller that arrives after retirement sees the record as filled.
//!
//! Lock order is always `pending` before the store's lock. The `attach`
//! callback runs without `pending` held.

use super::Embedder;
use crate::models::MemoryId;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// A memory that needs a vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingRequest {
    /// Memory id.
    pub id: MemoryId,
    /// Text to embed, as produced by `MemoryRecord::embedding_input`.
    pub input: String,
}

type FlightResult = std::result::Result<(), String>;

#[derive(Default)]
struct Flight {
    state: Mutex<Option<FlightResult>>,
    done: Condvar,
}

impl Flight {
    fn finish(&self, result: FlightResult) {
        *acquire_lock(&self.state) = Some(result);
        self.done.notify_all();
    }

    fn is_finished(&self) -> bool {
        acquire_lock(&self.state).is_some()
    }

    fn wait(&self) -> FlightResult {
        let mut state = acquire_lock(&self.state);
        loop {
            if let Some(result) = state.as_ref() {
                return result.clone();
            }
            state = self
                .done
                .wait(state)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }
}

/// Helper to acquire mutex lock with poison recovery.
fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Embedding cache mutex was poisoned, recovering");
            metrics::counter!("embedding_cache_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Retires every flight an owner still holds when it leaves `run_owned`,
/// including by unwinding, so waiters never block on an abandoned id.
struct OwnedFlights<'a> {
    cache: &'a EmbeddingCache,
    flights: &'a [(EmbeddingRequest, Arc<Flight>)],
}

impl Drop for OwnedFlights<'_> {
    fn drop(&mut self) {
        for (request, flight) in self.flights {
            if !flight.is_finished() {
                self.cache
                    .retire(&request.id, flight, Err("embedding abandoned".to_string()));
            }
        }
    }
}

/// Resolves missing vectors through an [`Embedder`].
pub struct EmbeddingCache {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    pending: Mutex<HashMap<MemoryId, Arc<Flight>>>,
}

impl EmbeddingCache {
    /// Default number of inputs per embed call.
    pub const DEFAULT_BATCH_SIZE: usize = 20;

    /// Creates a cache over an embedder.
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the maximum inputs per embed call (at least 1).
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// The underlying embedder.
    #[must_use]
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Embeds a search query. Queries are never cached.
    ///
    /// # Errors
    ///
    /// Returns the embedder's error.
    pub fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        metrics::counter!("embedding_requests_total", "kind" => "query").increment(1);
        self.embedder.embed(query)
    }

    /// Fills vectors for the given requests.
    ///
    /// `is_missing` reports whether a memory still lacks a valid vector; it is
    /// consulted under the pending lock so a retired flight is never redone.
    /// `attach` stores one vector and returns whether it was applied.
    ///
    /// Returns the number of vectors this call attached.
    ///
    /// # Errors
    ///
    /// Returns the first batch failure, either from this call's own batches or
    /// from a flight it waited on. Vectors attached by earlier batches stay.
    pub fn resolve<M, A>(
        &self,
        requests: Vec<EmbeddingRequest>,
        is_missing: M,
        attach: A,
    ) -> Result<usize>
    where
        M: Fn(&MemoryId) -> bool,
        A: Fn(&MemoryId, &str, Vec<f32>, &str) -> bool,
    {
        let mut owned: Vec<(EmbeddingRequest, Arc<Flight>)> = Vec::new();
        let mut waiting: Vec<Arc<Flight>> = Vec::new();

        {
            let mut pending = acquire_lock(&self.pending);
            for request in requests {
                if let Some(flight) = pending.get(&request.id) {
                    metrics::counter!("embedding_single_flight_joins_total").increment(1);
                    waiting.push(Arc::clone(flight));
                } else if is_missing(&request.id) {
                    let flight = Arc::new(Flight::default());
                    pending.insert(request.id.clone(), Arc::clone(&flight));
                    owned.push((request, flight));
                }
            }
        }

        if !owned.is_empty() || !waiting.is_empty() {
            tracing::debug!(
                owned = owned.len(),
                waiting = waiting.len(),
                batch_size = self.batch_size,
                "Resolving embeddings"
            );
        }

        let attached = self.run_owned(owned, &attach)?;

        for flight in waiting {
            flight.wait().map_err(|cause| Error::failed("embed_batch", cause))?;
        }

        Ok(attached)
    }

    fn run_owned<A>(&self, owned: Vec<(EmbeddingRequest, Arc<Flight>)>, attach: &A) -> Result<usize>
    where
        A: Fn(&MemoryId, &str, Vec<f32>, &str) -> bool,
    {
        let _guard = OwnedFlights {
            cache: self,
            flights: &owned,
        };
        let mut attached = 0;
        let mut chunks = owned.chunks(self.batch_size);

        while let Some(chunk) = chunks.next() {
            let inputs: Vec<String> = chunk.iter().map(|(r, _)| r.input.clone()).collect();
            metrics::counter!("embedding_requests_total", "kind" => "memories").increment(1);

            match self
                .embedder
                .embed_batch(&inputs)
                .and_then(|batch| batch.validate(chunk.len()))
            {
                Ok(batch) => {
                    for ((request, flight), vector) in chunk.iter().zip(batch.vectors) {
                        if attach(&request.id, &request.input, vector, &batch.model) {
                            attached += 1;
                        }
                        self.retire(&request.id, flight, Ok(()));
                    }
                },
                Err(e) => {
                    metrics::counter!("embedding_batch_failures_total").increment(1);
                    tracing::warn!(
                        embedder = self.embedder.name(),
                        error = %e,
                        "Embedding batch failed"
                    );
                    let cause = e.to_string();
                    for (request, flight) in chunk.iter().chain(chunks.flatten()) {
                        self.retire(&request.id, flight, Err(cause.clone()));
                    }
                    return Err(e);
                },
            }
        }

        Ok(attached)
    }

    fn retire(&self, id: &MemoryId, flight: &Arc<Flight>, result: FlightResult) {
        flight.finish(result);
        let mut pending = acquire_lock(&self.pending);
        if pending.get(id).is_some_and(|current| Arc::ptr_eq(current, flight)) {
            pending.remove(id);
        }
    }
}

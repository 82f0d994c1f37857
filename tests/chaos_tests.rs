//! Chaos testing for concurrent access.
//!
//! Tests concurrent operations to find race conditions and deadlocks:
//! - Concurrent embedding requests for the same memories share one batch
//! - Edits racing an in-flight embedding never attach a stale vector
//! - Mixed read/write workloads on the store
//! - Superseded searches are discarded

// Chaos tests use expect/unwrap/panic for simplicity - panics are acceptable in tests
// Excessive nesting is acceptable in concurrent test code with thread spawns
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::excessive_nesting
)]

use memory_lane::embedding::{Embedder, EmbeddingBatch};
use memory_lane::models::{EMBEDDING_DIMENSIONS, SearchMode};
use memory_lane::retrieval::BrowseQuery;
use memory_lane::{Category, Error, MemoryId, MemoryRecord, MemoryStore, Result, SearchSession};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

/// Counts calls and sleeps so concurrent callers overlap.
struct SlowEmbedder {
    calls: AtomicUsize,
    inputs: AtomicUsize,
    delay: Duration,
}

impl SlowEmbedder {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            inputs: AtomicUsize::new(0),
            delay,
        })
    }
}

impl Embedder for SlowEmbedder {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn embed_batch(&self, inputs: &[String]) -> Result<EmbeddingBatch> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.fetch_add(inputs.len(), Ordering::SeqCst);
        thread::sleep(self.delay);
        Ok(EmbeddingBatch {
            vectors: vec![vec![0.25; EMBEDDING_DIMENSIONS]; inputs.len()],
            model: "slow-v1".to_string(),
        })
    }
}

/// Always fails after a delay.
struct BrokenEmbedder {
    calls: AtomicUsize,
}

impl Embedder for BrokenEmbedder {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn embed_batch(&self, _inputs: &[String]) -> Result<EmbeddingBatch> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        Err(Error::failed("embed_batch", "status 502"))
    }
}

fn seeded_store(embedder: Arc<dyn Embedder>, count: usize) -> (MemoryStore, Vec<MemoryId>) {
    let store = MemoryStore::new(embedder);
    let ids = (0..count)
        .map(|i| store.add(MemoryRecord::new(Category::Other, format!("note {i}"), vec![])))
        .collect();
    (store, ids)
}

#[test]
fn test_concurrent_callers_share_one_batch() {
    let embedder = SlowEmbedder::new(Duration::from_millis(150));
    let (store, ids) = seeded_store(embedder.clone(), 5);

    let num_threads = 8;
    let barrier = Arc::new(Barrier::new(num_threads));
    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let store = store.clone();
            let ids = ids.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.ensure_embeddings(&ids)
            })
        })
        .collect();

    let attached: usize = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked").expect("embedding failed"))
        .sum();

    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(embedder.inputs.load(Ordering::SeqCst), 5);
    assert_eq!(attached, 5);
    assert!(store.snapshot().iter().all(MemoryRecord::has_valid_embedding));
}

#[test]
fn test_waiters_see_owner_failure() {
    let embedder = Arc::new(BrokenEmbedder {
        calls: AtomicUsize::new(0),
    });
    let (store, ids) = seeded_store(embedder.clone(), 3);

    let num_threads = 4;
    let barrier = Arc::new(Barrier::new(num_threads));
    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let store = store.clone();
            let ids = ids.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.ensure_embeddings(&ids)
            })
        })
        .collect();

    for handle in handles {
        let result = handle.join().expect("thread panicked");
        // A caller arriving after the failed flight retired starts its own.
        assert!(result.is_err());
    }
    assert!(embedder.calls.load(Ordering::SeqCst) >= 1);
    assert!(store.snapshot().iter().all(|m| m.embedding.is_none()));
}

#[test]
fn test_edit_during_embedding_discards_stale_vector() {
    let embedder = SlowEmbedder::new(Duration::from_millis(200));
    let (store, ids) = seeded_store(embedder.clone(), 1);
    let id = ids[0].clone();

    let worker = {
        let store = store.clone();
        let ids = ids.clone();
        thread::spawn(move || store.ensure_embeddings(&ids))
    };

    thread::sleep(Duration::from_millis(50));
    store
        .update(&id, Category::Food, "edited while embedding", vec![])
        .unwrap();

    assert_eq!(worker.join().unwrap().unwrap(), 0);
    assert!(store.get(&id).unwrap().embedding.is_none());

    // The next request embeds the edited text.
    assert_eq!(store.ensure_embeddings(&ids).unwrap(), 1);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_mixed_read_write_workload() {
    let embedder = SlowEmbedder::new(Duration::from_millis(1));
    let (store, _) = seeded_store(embedder, 20);

    let num_threads = 6;
    let ops_per_thread = 50;
    let completed = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let store = store.clone();
            let completed = Arc::clone(&completed);
            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    match (t + i) % 4 {
                        0 => {
                            store.add(MemoryRecord::new(
                                Category::Memories,
                                format!("thread {t} op {i}"),
                                vec![],
                            ));
                        },
                        1 => {
                            let _ = store.ensure_all_embeddings();
                        },
                        2 => {
                            let _ = store.snapshot().len();
                        },
                        _ => {
                            if let Some(first) = store.snapshot().first() {
                                let _ = store.update(
                                    &first.id,
                                    first.category,
                                    format!("{} (edited)", first.text),
                                    first.tags.clone(),
                                );
                            }
                        },
                    }
                }
                completed.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("thread panicked");
    }

    assert_eq!(completed.load(Ordering::SeqCst), num_threads);
    store.ensure_all_embeddings().unwrap();
    assert!(store.snapshot().iter().all(MemoryRecord::has_valid_embedding));
}

#[test]
fn test_superseded_search_is_discarded() {
    let embedder = SlowEmbedder::new(Duration::from_millis(100));
    let (store, _) = seeded_store(embedder, 3);
    let session = Arc::new(SearchSession::new(store));

    let stale = session.begin();
    let slow = {
        let session = Arc::clone(&session);
        thread::spawn(move || {
            session.search_with_ticket(stale, &BrowseQuery::new("note"), SearchMode::Semantic)
        })
    };

    thread::sleep(Duration::from_millis(20));
    let fresh = session.begin();
    let fresh_results =
        session.search_with_ticket(fresh, &BrowseQuery::new("note 1"), SearchMode::Keyword);

    assert!(slow.join().unwrap().is_none());
    assert_eq!(fresh_results.map(|r| r.len()), Some(1));
}

//! Benchmarks for memory ranking.
//!
//! Benchmark targets (keyword ranking, single query):
//! - 100 memories: <1ms
//! - 1,000 memories: <5ms
//! - 10,000 memories: <50ms
//!
//! Semantic ranking is measured on precomputed vectors, so only the cosine
//! scoring and the sort are timed.

// Criterion macros generate items without docs - this is expected for benchmarks
// Benchmarks use expect/unwrap for simplicity - panics are acceptable in benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::cast_precision_loss)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

use memory_lane::models::EMBEDDING_DIMENSIONS;
use memory_lane::retrieval::{BrowseQuery, browse_keyword, rank_keyword, rank_semantic};
use memory_lane::services::build_context;
use memory_lane::{Category, MemoryRecord, Timestamp};

// ============================================================================
// Helper Functions
// ============================================================================

const PHRASES: [&str; 8] = [
    "Loves spicy ramen from the corner shop",
    "Wants to hike the coastal trail in spring",
    "Favorite flowers are peonies",
    "Allergic to shellfish",
    "Dreams of a trip to Kyoto in autumn",
    "Collects vintage vinyl records",
    "Birthday dinner at the Italian place was perfect",
    "Mentioned a wool scarf in dark green",
];

/// Deterministic vector spread across the dimensions.
fn vector(seed: usize) -> Vec<f32> {
    (0..EMBEDDING_DIMENSIONS)
        .map(|i| (((seed * 31 + i * 17) % 101) as f32 / 50.0) - 1.0)
        .collect()
}

fn memories(count: usize) -> Vec<MemoryRecord> {
    let categories = Category::all();
    (0..count)
        .map(|i| {
            MemoryRecord::new(
                categories[i % categories.len()],
                format!("{} ({i})", PHRASES[i % PHRASES.len()]),
                vec![format!("tag{}", i % 13)],
            )
            .with_id(format!("mem-{i}"))
            .with_created_at(Timestamp::new(format!(
                "2024-{:02}-{:02}T00:00:00.000Z",
                i % 12 + 1,
                i % 28 + 1
            )))
            .with_embedding(vector(i), "bench-v1")
        })
        .collect()
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_keyword_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyword_ranking");
    group.measurement_time(Duration::from_secs(10));

    for count in &[100, 1_000, 10_000] {
        let data = memories(*count);

        group.bench_with_input(BenchmarkId::new("matching", count), count, |b, _| {
            b.iter(|| rank_keyword(black_box("kyoto trip in autumn"), black_box(&data), 30));
        });

        group.bench_with_input(BenchmarkId::new("fallback", count), count, |b, _| {
            b.iter(|| rank_keyword(black_box("zzz qqq"), black_box(&data), 30));
        });
    }

    group.finish();
}

fn bench_semantic_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("semantic_ranking");
    group.measurement_time(Duration::from_secs(10));
    let query = vector(7);

    for count in &[100, 1_000, 10_000] {
        let data = memories(*count);
        group.bench_with_input(BenchmarkId::new("cosine", count), count, |b, _| {
            b.iter(|| rank_semantic(black_box(&query), black_box(&data)));
        });
    }

    group.finish();
}

fn bench_browse_and_context(c: &mut Criterion) {
    let data = memories(1_000);
    let mut group = c.benchmark_group("browse_and_context");

    group.bench_function("browse_keyword", |b| {
        let query = BrowseQuery::new("scarf").with_category(Some(Category::Gifts));
        b.iter(|| browse_keyword(black_box(&query), black_box(&data)));
    });

    group.bench_function("build_context_30", |b| {
        let top: Vec<MemoryRecord> = data.iter().take(30).cloned().collect();
        b.iter(|| build_context(black_box(&top)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_keyword_scaling,
    bench_semantic_scaling,
    bench_browse_and_context
);
criterion_main!(benches);

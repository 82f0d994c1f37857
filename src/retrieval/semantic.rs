//! Similarity ranking over stored vectors.

use crate::embedding::cosine_similarity;
use crate::models::{MemoryRecord, RankedCandidate};

/// Ranks memories by cosine similarity to `query_vector`, best first.
///
/// Memories without a valid vector score 0. There is no threshold; ties are
/// broken newest first.
#[must_use]
pub fn rank_semantic(query_vector: &[f32], memories: &[MemoryRecord]) -> Vec<RankedCandidate> {
    let mut ranked: Vec<(RankedCandidate, i64)> = memories
        .iter()
        .map(|memory| {
            let score = memory
                .embedding
                .as_deref()
                .filter(|_| memory.has_valid_embedding())
                .map_or(0.0, |vector| cosine_similarity(query_vector, vector));
            (
                RankedCandidate::new(memory.clone(), score),
                memory.created_at.millis(),
            )
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.0.score
            .total_cmp(&a.0.score)
            .then_with(|| b.1.cmp(&a.1))
    });

    ranked.into_iter().map(|(candidate, _)| candidate).collect()
}

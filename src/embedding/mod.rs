//! Embedding generation.
//!
//! Memories are embedded as `category | tags | text` strings. Vectors come
//! either from a gateway endpoint ([`GatewayEmbedder`]) or straight from the
//! router model ([`LlmEmbedder`]); [`EmbeddingCache`] batches the requests and
//! keeps concurrent callers from embedding the same memory twice.

mod cache;
mod gateway;
mod llm;

pub use cache::{EmbeddingCache, EmbeddingRequest};
pub use gateway::GatewayEmbedder;
pub use llm::LlmEmbedder;

use crate::models::is_valid_embedding;
use crate::{Error, Result};

/// Vectors returned for one batch of inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingBatch {
    /// One vector per input, same order.
    pub vectors: Vec<Vec<f32>>,
    /// Label of the model that produced them.
    pub model: String,
}

impl EmbeddingBatch {
    /// Checks the batch against the number of inputs sent.
    ///
    /// # Errors
    ///
    /// Fails on an arity mismatch or any vector that is not
    /// [`crate::models::EMBEDDING_DIMENSIONS`] finite values.
    pub fn validate(self, expected: usize) -> Result<Self> {
        if self.vectors.len() != expected {
            return Err(Error::failed(
                "embed_batch",
                format!("expected {expected} vectors, got {}", self.vectors.len()),
            ));
        }
        if let Some(index) = self.vectors.iter().position(|v| !is_valid_embedding(v)) {
            return Err(Error::failed(
                "embed_batch",
                format!("vector {index} is not a valid embedding"),
            ));
        }
        Ok(self)
    }
}

/// Trait for embedding generators.
pub trait Embedder: Send + Sync {
    /// The embedder name, for logs.
    fn name(&self) -> &'static str;

    /// Generates one vector per input.
    ///
    /// Implementations return a batch that already passed
    /// [`EmbeddingBatch::validate`].
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails or the reply is malformed.
    fn embed_batch(&self, inputs: &[String]) -> Result<EmbeddingBatch>;

    /// Generates a vector for a single text, such as a search query.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    fn embed(&self, input: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[input.to_string()])?
            .vectors
            .into_iter()
            .next()
            .ok_or_else(|| Error::failed("embed", "embedder returned no vector"))
    }
}

/// Computes cosine similarity between two embedding vectors.
///
/// Returns 0.0 when either vector is empty, the lengths differ, or a
/// magnitude is zero. The result is clamped to `[-1.0, 1.0]` and is never NaN.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot_product / (norm_a * norm_b);
    if !similarity.is_finite() {
        return 0.0;
    }

    #[allow(clippy::cast_possible_truncation)]
    let similarity = similarity.clamp(-1.0, 1.0) as f32;
    similarity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EMBEDDING_DIMENSIONS;

    #[test]
    fn test_cosine_similarity_identical() {
        let v = vec![1.0, 0.0, 0.0];
        let similarity = cosine_similarity(&v, &v);
        assert!(
            (similarity - 1.0).abs() < 0.001,
            "Identical vectors should have similarity ~1.0"
        );
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let v1 = vec![1.0, 0.0, 0.0];
        let v2 = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&v1, &v2).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let v1 = vec![1.0, 2.0];
        let v2 = vec![-1.0, -2.0];
        assert!((cosine_similarity(&v1, &v2) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_degenerate() {
        assert!(cosine_similarity(&[], &[]).abs() < f32::EPSILON);
        assert!(cosine_similarity(&[1.0], &[1.0, 2.0]).abs() < f32::EPSILON);
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).abs() < f32::EPSILON);
    }

    #[test]
    fn test_batch_validate() {
        let good = EmbeddingBatch {
            vectors: vec![vec![0.1; EMBEDDING_DIMENSIONS]; 2],
            model: "m".to_string(),
        };
        assert!(good.clone().validate(2).is_ok());
        assert!(good.validate(3).is_err());

        let short = EmbeddingBatch {
            vectors: vec![vec![0.1; 4]],
            model: "m".to_string(),
        };
        assert!(short.validate(1).is_err());
    }
}

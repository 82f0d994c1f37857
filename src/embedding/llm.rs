//! Vectors produced directly by a language model.
//!
//! Used when no embed endpoint is configured. The model is asked for strict
//! JSON; vectors of the wrong length are padded or truncated to
//! [`EMBEDDING_DIMENSIONS`], while any non-numeric component fails the batch.

use super::{EmbeddingBatch, Embedder};
use crate::llm::{CompletionRequest, LlmProvider, parse_json_object};
use crate::models::EMBEDDING_DIMENSIONS;
use crate::{Error, Result};
use serde_json::Value;
use std::sync::Arc;

/// Label stored with vectors from this embedder.
pub const LLM_EMBEDDING_MODEL: &str = "claude-semantic-v1";

const MAX_TOKENS: u32 = 3500;

/// Embedder that asks an LLM for vectors.
pub struct LlmEmbedder {
    provider: Arc<dyn LlmProvider>,
}

impl LlmEmbedder {
    /// Creates an embedder over the given provider (normally the router model).
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    fn system_prompt() -> String {
        format!(
            "You convert text inputs into semantic vectors.\n\
             Return STRICT JSON only with this shape:\n\
             {{\"model\":\"{LLM_EMBEDDING_MODEL}\",\"vectors\":[[number,...],[number,...]]}}\n\
             Rules:\n\
             - Return exactly one vector per input, same order.\n\
             - Each vector MUST contain exactly {EMBEDDING_DIMENSIONS} numeric values.\n\
             - Values should be floats typically in range [-1, 1].\n\
             - No markdown, no commentary."
        )
    }
}

impl Embedder for LlmEmbedder {
    fn name(&self) -> &'static str {
        "llm"
    }

    fn embed_batch(&self, inputs: &[String]) -> Result<EmbeddingBatch> {
        if inputs.is_empty() {
            return Err(Error::InvalidInput(
                "inputs must be a non-empty array of strings".to_string(),
            ));
        }

        let user = serde_json::json!({ "inputs": inputs }).to_string();
        let request = CompletionRequest::single(Self::system_prompt(), user)
            .with_max_tokens(MAX_TOKENS)
            .with_temperature(0.0);

        let reply = self.provider.complete(&request)?;
        let parsed = parse_json_object("embed_batch", &reply)?;

        let vectors = parsed
            .get("vectors")
            .and_then(Value::as_array)
            .map(|vectors| {
                vectors
                    .iter()
                    .map(normalize_vector)
                    .collect::<Option<Vec<_>>>()
            })
            .ok_or_else(|| Error::failed("embed_batch", "model reply has no vectors array"))?
            .ok_or_else(|| Error::failed("embed_batch", "Invalid vector output from model"))?;

        EmbeddingBatch {
            vectors,
            model: LLM_EMBEDDING_MODEL.to_string(),
        }
        .validate(inputs.len())
    }
}

/// Coerces a JSON array into a vector of exactly [`EMBEDDING_DIMENSIONS`].
///
/// Numeric strings are accepted. Returns `None` for a non-array or any
/// component that is not a finite number.
fn normalize_vector(value: &Value) -> Option<Vec<f32>> {
    let items = value.as_array()?;
    let mut vector = items
        .iter()
        .map(|item| {
            let number = match item {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }?;
            #[allow(clippy::cast_possible_truncation)]
            let component = number as f32;
            component.is_finite().then_some(component)
        })
        .collect::<Option<Vec<f32>>>()?;

    vector.resize(EMBEDDING_DIMENSIONS, 0.0);
    Some(vector)
}

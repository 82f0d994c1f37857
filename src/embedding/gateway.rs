//! HTTP embed endpoint client.

use super::{EmbeddingBatch, Embedder};
use crate::llm::{LlmHttpConfig, build_http_client, transport_error};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Embedder backed by an endpoint speaking `{inputs} -> {vectors, model}`.
pub struct GatewayEmbedder {
    /// Full URL of the embed endpoint.
    endpoint: String,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl GatewayEmbedder {
    /// Creates an embedder for the given endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: build_http_client(LlmHttpConfig::default()),
        }
    }

    /// Sets HTTP client timeouts.
    #[must_use]
    pub fn with_http_config(mut self, config: LlmHttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    vectors: Vec<Vec<f32>>,
    #[serde(default)]
    model: Option<String>,
}

impl Embedder for GatewayEmbedder {
    fn name(&self) -> &'static str {
        "gateway"
    }

    fn embed_batch(&self, inputs: &[String]) -> Result<EmbeddingBatch> {
        if inputs.is_empty() {
            return Err(Error::InvalidInput(
                "inputs must be a non-empty array of strings".to_string(),
            ));
        }

        tracing::debug!(endpoint = %self.endpoint, inputs = inputs.len(), "Requesting embeddings");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest { inputs })
            .send()
            .map_err(|e| transport_error("embed_batch", &e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            tracing::warn!(endpoint = %self.endpoint, status = %status, "Embed endpoint returned error status");
            return Err(Error::failed(
                "embed_batch",
                format!("embed endpoint returned status: {status} - {body}"),
            ));
        }

        let payload: EmbedResponse = response
            .json()
            .map_err(|e| Error::failed("embed_batch", format!("invalid embed response: {e}")))?;

        EmbeddingBatch {
            vectors: payload.vectors,
            model: payload.model.unwrap_or_else(|| "unknown".to_string()),
        }
        .validate(inputs.len())
    }
}

//! Anthropic Messages API client.

use super::{CompletionRequest, LlmHttpConfig, LlmProvider, build_http_client, transport_error};
use crate::models::ChatMessage;
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Anthropic Claude LLM client.
pub struct AnthropicClient {
    /// API key.
    api_key: Option<SecretString>,
    /// API endpoint.
    endpoint: String,
    /// Model to use.
    model: String,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl AnthropicClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.anthropic.com/v1";

    /// Default model for answers and gift ideas.
    pub const DEFAULT_MODEL: &'static str = "claude-sonnet-4-20250514";

    /// Default model for routing calls and LLM-produced vectors.
    pub const DEFAULT_ROUTER_MODEL: &'static str = "claude-3-5-haiku-20241022";

    /// Creates a new client reading `ANTHROPIC_API_KEY`.
    #[must_use]
    pub fn new() -> Self {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .map(SecretString::from);
        Self {
            api_key,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            client: build_http_client(LlmHttpConfig::default()),
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Sets the API key from an already-wrapped secret.
    #[must_use]
    pub fn with_secret_key(mut self, key: SecretString) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets HTTP client timeouts.
    #[must_use]
    pub fn with_http_config(mut self, config: LlmHttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// Returns the configured model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Validates that the client has a usable API key.
    ///
    /// The `sk-ant-` format is only enforced against the public endpoint;
    /// self-hosted gateways may issue their own keys.
    fn validate(&self) -> Result<&SecretString> {
        let key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::failed("anthropic_request", "ANTHROPIC_API_KEY not set"))?;

        if self.endpoint == Self::DEFAULT_ENDPOINT && !Self::is_valid_api_key_format(key.expose_secret()) {
            return Err(Error::failed(
                "anthropic_request",
                "Invalid API key format: expected 'sk-ant-' prefix",
            ));
        }

        Ok(key)
    }

    /// Checks if an API key has a valid format.
    ///
    /// Valid keys start with `sk-ant-`, are at least 40 characters, and
    /// contain only alphanumerics, hyphens and underscores.
    fn is_valid_api_key_format(key: &str) -> bool {
        const MIN_KEY_LENGTH: usize = 40;
        const PREFIX: &str = "sk-ant-";

        if !key.starts_with(PREFIX) || key.len() < MIN_KEY_LENGTH {
            return false;
        }

        key.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    /// Builds the wire request.
    fn build_request<'a>(&'a self, request: &'a CompletionRequest) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: (!request.system.is_empty()).then_some(request.system.as_str()),
            messages: request.messages.iter().map(WireMessage::from).collect(),
        }
    }
}

impl Default for AnthropicClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmProvider for AnthropicClient {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let api_key = self.validate()?;

        tracing::info!(provider = "anthropic", model = %self.model, "Making LLM request");

        let response = self
            .client
            .post(format!("{}/messages", self.endpoint))
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&self.build_request(request))
            .send()
            .map_err(|e| transport_error("anthropic_request", &e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            tracing::error!(
                provider = "anthropic",
                model = %self.model,
                status = %status,
                body = %body,
                "LLM API returned error status"
            );
            return Err(Error::failed(
                "anthropic_request",
                format!("API returned status: {status} - {body}"),
            ));
        }

        let response: MessagesResponse = response.json().map_err(|e| {
            tracing::error!(
                provider = "anthropic",
                model = %self.model,
                error = %e,
                "Failed to parse LLM response"
            );
            Error::failed("anthropic_response", e)
        })?;

        Ok(response.text())
    }
}

/// Request to the Messages API.
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<WireMessage<'a>>,
}

/// A message in the API format.
#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a ChatMessage> for WireMessage<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        Self {
            role: message.role.as_str(),
            content: &message.content,
        }
    }
}

/// Response from the Messages API.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

impl MessagesResponse {
    /// Joins every text block with newlines, trimmed.
    fn text(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

/// Content block in a response.
#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

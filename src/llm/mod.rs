//! LLM client abstraction.
//!
//! Every model call in the pipeline (intent classification, sufficiency,
//! answer generation, gift ideas, LLM-produced vectors) goes through
//! [`LlmProvider`], so tests can swap the gateway for a stub.

mod anthropic;
mod deadline;

pub use anthropic::AnthropicClient;
pub use deadline::complete_with_deadline;

use crate::models::ChatMessage;
use crate::{Error, Result};
use std::time::Duration;

/// A single request to a chat-style model.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System prompt.
    pub system: String,
    /// Conversation, oldest first; the last entry is the user turn.
    pub messages: Vec<ChatMessage>,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature; provider default when `None`.
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Default token budget for answers.
    pub const DEFAULT_MAX_TOKENS: u32 = 1000;

    /// Creates a request with the default token budget.
    #[must_use]
    pub fn new(system: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            system: system.into(),
            messages,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }

    /// Creates a request with a single user turn.
    #[must_use]
    pub fn single(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self::new(system, vec![ChatMessage::user(user)])
    }

    /// Sets the token budget.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Trait for LLM providers.
pub trait LlmProvider: Send + Sync {
    /// The provider name.
    fn name(&self) -> &'static str;

    /// Runs a completion and returns the reply text.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails or the reply cannot be read.
    fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Generates a completion with a system prompt and one user turn.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion fails.
    fn complete_with_system(&self, system: &str, user: &str) -> Result<String> {
        self.complete(&CompletionRequest::single(system, user))
    }
}

/// HTTP client configuration for LLM providers.
#[derive(Debug, Clone, Copy)]
pub struct LlmHttpConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for LlmHttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

impl LlmHttpConfig {
    /// Loads HTTP configuration from config file settings.
    #[must_use]
    pub const fn from_config(config: &crate::config::LlmConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            connect_timeout_ms: config.connect_timeout_ms,
        }
    }
}

/// Builds a blocking HTTP client with configured timeouts.
#[must_use]
pub fn build_http_client(config: LlmHttpConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build LLM HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

/// Maps a reqwest transport error, logging its kind.
pub(crate) fn transport_error(operation: &str, e: &reqwest::Error) -> Error {
    let error_kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_request() {
        "request"
    } else {
        "unknown"
    };
    tracing::error!(
        operation,
        error = %e,
        error_kind,
        "Gateway request failed"
    );
    Error::failed(operation, format!("{error_kind} error: {e}"))
}

/// Extracts the JSON object from an LLM reply.
///
/// Handles fenced code blocks and prose around the object. Returns `None`
/// when no `{...}` span exists.
#[must_use]
pub fn extract_json_object(response: &str) -> Option<&str> {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let json_start = start + 7;
        if let Some(end) = trimmed[json_start..].find("```") {
            let inner = trimmed[json_start..json_start + end].trim();
            if inner.starts_with('{') {
                return Some(inner);
            }
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

/// Parses the JSON object embedded in an LLM reply.
///
/// # Errors
///
/// Returns an error if the reply holds no JSON object or it does not parse.
pub fn parse_json_object(operation: &str, response: &str) -> Result<serde_json::Value> {
    let json = extract_json_object(response)
        .ok_or_else(|| Error::failed(operation, "No JSON object found in model response"))?;
    serde_json::from_str(json).map_err(|e| Error::failed(operation, format!("Invalid JSON: {e}")))
}

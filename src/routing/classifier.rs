//! LLM-backed intent and sufficiency classification.
//!
//! Both calls are cheap single-label completions on the router model. Any
//! failure (transport error, timeout, or a label outside the allowed set)
//! yields the documented default wrapped in [`Outcome::Degraded`].

use super::{Intent, Sufficiency};
use crate::llm::{CompletionRequest, LlmProvider, complete_with_deadline};
use crate::models::{MemoryRecord, Outcome};
use std::sync::Arc;
use std::time::Duration;

const INTENT_SYSTEM_PROMPT: &str = "Classify the user request into one label:\n\
- MEMORY: asks for known personal details/preferences already in saved memories\n\
- WORLD: asks for general world knowledge, local businesses, or info outside saved memories\n\
- HYBRID: asks for ideas/plans/recommendations that should combine saved preferences with world knowledge\n\
Respond with exactly one token: MEMORY or WORLD or HYBRID.";

const SUFFICIENCY_SYSTEM_PROMPT: &str = "You evaluate whether retrieved memories are enough to answer a user question.\n\
Respond ONLY with ENOUGH or NOT_ENOUGH.";

const LABEL_MAX_TOKENS: u32 = 10;

/// Routes questions using the router model.
#[derive(Clone)]
pub struct IntentRouter {
    provider: Arc<dyn LlmProvider>,
    timeout: Duration,
    digest_limit: usize,
}

impl IntentRouter {
    /// Default wall-clock bound per classifier call.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Default number of memories shown to the sufficiency check.
    pub const DEFAULT_DIGEST_LIMIT: usize = 15;

    /// Creates a router over the given provider.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            timeout: Self::DEFAULT_TIMEOUT,
            digest_limit: Self::DEFAULT_DIGEST_LIMIT,
        }
    }

    /// Sets the per-call bound.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how many memories the sufficiency digest includes.
    #[must_use]
    pub const fn with_digest_limit(mut self, digest_limit: usize) -> Self {
        self.digest_limit = digest_limit;
        self
    }

    fn ask_label(&self, operation: &'static str, system: &str, user: String) -> crate::Result<String> {
        let request = CompletionRequest::single(system, user)
            .with_max_tokens(LABEL_MAX_TOKENS)
            .with_temperature(0.0);
        complete_with_deadline(&self.provider, request, self.timeout, operation)
    }

    /// Classifies what a question needs. Defaults to HYBRID.
    #[must_use]
    pub fn classify_intent(&self, message: &str) -> Outcome<Intent> {
        let outcome = match self.ask_label("classify_intent", INTENT_SYSTEM_PROMPT, message.to_string()) {
            Ok(reply) => match Intent::parse(&reply) {
                Some(intent) => Outcome::Ok(intent),
                None => Outcome::degraded(
                    Intent::Hybrid,
                    format!("unrecognized intent label '{}', defaulting to HYBRID", reply.trim()),
                ),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Intent classification failed, defaulting to HYBRID");
                Outcome::degraded(
                    Intent::Hybrid,
                    format!("intent classification failed, defaulting to HYBRID: {e}"),
                )
            },
        };

        let label = outcome.value().map_or("none", Intent::as_str);
        let status = if outcome.is_ok() { "ok" } else { "degraded" };
        metrics::counter!("intent_classifications_total", "intent" => label, "status" => status)
            .increment(1);
        tracing::debug!(intent = label, status, "Classified intent");
        outcome
    }

    /// Checks whether `retrieved` answers `message`. Defaults to NOT_ENOUGH.
    ///
    /// An empty retrieval is NOT_ENOUGH without a call.
    #[must_use]
    pub fn check_sufficiency(&self, message: &str, retrieved: &[MemoryRecord]) -> Outcome<Sufficiency> {
        if retrieved.is_empty() {
            return Outcome::Ok(Sufficiency::NotEnough);
        }

        let user = format!(
            "Question:\n{message}\n\nRetrieved memories:\n{}\n\nDo these memories contain enough info to answer the question?",
            memory_digest(retrieved, self.digest_limit)
        );

        let outcome = match self.ask_label("check_sufficiency", SUFFICIENCY_SYSTEM_PROMPT, user) {
            Ok(reply) => match Sufficiency::parse(&reply) {
                Some(verdict) => Outcome::Ok(verdict),
                None => Outcome::degraded(
                    Sufficiency::NotEnough,
                    format!("unrecognized sufficiency verdict '{}', defaulting to NOT_ENOUGH", reply.trim()),
                ),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Sufficiency check failed, defaulting to NOT_ENOUGH");
                Outcome::degraded(
                    Sufficiency::NotEnough,
                    format!("sufficiency check failed, defaulting to NOT_ENOUGH: {e}"),
                )
            },
        };

        let status = if outcome.is_ok() { "ok" } else { "degraded" };
        metrics::counter!("sufficiency_checks_total", "status" => status).increment(1);
        outcome
    }
}

/// Numbered `[category] text` lines for the first `limit` memories.
#[must_use]
pub fn memory_digest(memories: &[MemoryRecord], limit: usize) -> String {
    memories
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, m)| format!("{}. [{}] {}", i + 1, m.category, m.text))
        .collect::<Vec<_>>()
        .join("\n")
}

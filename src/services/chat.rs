//! Question answering over the memory collection.
//!
//! Per question, strictly in order:
//!
//! 1. classify intent (router model)
//! 2. unless WORLD, retrieve memories (keyword, or semantic with fallback)
//! 3. unless WORLD, check sufficiency (router model)
//! 4. resolve the response mode
//! 5. assemble context and system prompt
//! 6. generate the answer
//!
//! Routing and retrieval failures only add advisories. A generation failure
//! turns into a system-role reply; the turn still completes.

use super::MemoryStore;
use super::context::{build_context, build_conversation, build_system_prompt};
use super::supersede::{QuerySequencer, QueryTicket};
use crate::config::RetrievalConfig;
use crate::llm::{CompletionRequest, LlmProvider};
use crate::models::{ChatMessage, MemoryRecord, Outcome, SearchMode, into_memories};
use crate::retrieval::{HybridRetriever, KeywordRanker};
use crate::routing::{Intent, IntentRouter, ResponseMode, Sufficiency, resolve_mode};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Reply used when the generator fails.
pub const GENERATION_FAILURE_REPLY: &str =
    "Sorry, I encountered an error. Please check that the gateway is reachable and your API key is set.";

/// Reply used when the generator returns no text.
pub const EMPTY_REPLY: &str = "I could not generate a response.";

/// Everything produced for one question.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    /// Assistant reply, or a system notice if generation failed.
    pub reply: ChatMessage,
    /// Classified intent (HYBRID on classification failure).
    pub intent: Intent,
    /// Sufficiency verdict.
    pub sufficiency: Sufficiency,
    /// Mode the answer was framed in.
    pub mode: ResponseMode,
    /// Number of memories placed in the context.
    pub retrieved: usize,
    /// Fallbacks that were taken, for display.
    pub advisories: Vec<String>,
    /// Whether generation failed.
    pub failed: bool,
}

/// Routing decision and context for a question, before generation.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTurn {
    /// Classified intent.
    pub intent: Intent,
    /// Sufficiency verdict.
    pub sufficiency: Sufficiency,
    /// Resolved mode.
    pub mode: ResponseMode,
    /// Retrieved memories, best first.
    pub memories: Vec<MemoryRecord>,
    /// Full system prompt.
    pub system_prompt: String,
    /// Fallbacks taken so far.
    pub advisories: Vec<String>,
}

/// Service answering questions about the stored memories.
pub struct ChatService {
    router: IntentRouter,
    retriever: HybridRetriever,
    generator: Arc<dyn LlmProvider>,
    sequencer: QuerySequencer,
}

impl ChatService {
    /// Creates a chat service.
    ///
    /// `router` serves classification calls, `generator` the answers.
    #[must_use]
    pub fn new(
        router: Arc<dyn LlmProvider>,
        generator: Arc<dyn LlmProvider>,
        store: MemoryStore,
        retrieval: &RetrievalConfig,
    ) -> Self {
        let keyword = KeywordRanker {
            limit: retrieval.limit,
            fallback_limit: retrieval.fallback_limit,
        };
        Self {
            router: IntentRouter::new(router).with_digest_limit(retrieval.digest_limit),
            retriever: HybridRetriever::new(store).with_keyword_ranker(keyword),
            generator,
            sequencer: QuerySequencer::new(),
        }
    }

    /// Sets the wall-clock bound on each classifier call.
    #[must_use]
    pub fn with_classification_timeout(mut self, timeout: Duration) -> Self {
        self.router = self.router.with_timeout(timeout);
        self
    }

    /// Runs steps 1–5 of the pipeline.
    #[must_use]
    pub fn prepare(&self, message: &str, semantic: bool) -> PreparedTurn {
        let mut advisories = Vec::new();

        let intent = take_value(self.router.classify_intent(message), Intent::Hybrid, &mut advisories);

        let (memories, sufficiency) = if intent == Intent::World {
            (Vec::new(), Sufficiency::NotNeeded)
        } else {
            let mode = SearchMode::from_semantic_flag(semantic);
            let ranked = take_value(self.retriever.retrieve(message, mode), Vec::new(), &mut advisories);
            let memories = into_memories(ranked);
            let sufficiency = take_value(
                self.router.check_sufficiency(message, &memories),
                Sufficiency::NotEnough,
                &mut advisories,
            );
            (memories, sufficiency)
        };

        let mode = resolve_mode(intent, sufficiency);
        let context = build_context(&memories);
        let system_prompt = build_system_prompt(mode, &context, intent, sufficiency);

        tracing::info!(
            intent = %intent,
            sufficiency = %sufficiency,
            mode = %mode,
            retrieved = memories.len(),
            "Routed question"
        );

        PreparedTurn {
            intent,
            sufficiency,
            mode,
            memories,
            system_prompt,
            advisories,
        }
    }

    /// Answers `message` given the prior conversation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty message. Every other
    /// failure is absorbed into the returned turn.
    pub fn ask(&self, message: &str, history: &[ChatMessage], semantic: bool) -> Result<ChatTurn> {
        if message.trim().is_empty() {
            return Err(Error::InvalidInput("message is required".to_string()));
        }

        let start = Instant::now();
        let prepared = self.prepare(message, semantic);
        let request = CompletionRequest::new(
            prepared.system_prompt.clone(),
            build_conversation(history, message),
        );

        let answer = self.generate_answer(&request);
        let failed = answer.is_failed();
        let reply = answer
            .into_value()
            .unwrap_or_else(|| ChatMessage::system(GENERATION_FAILURE_REPLY));

        let status = if failed { "error" } else { "success" };
        metrics::counter!("chat_turns_total", "mode" => prepared.mode.as_str(), "status" => status)
            .increment(1);
        tracing::debug!(elapsed_ms = start.elapsed().as_millis(), status, "Chat turn complete");

        Ok(ChatTurn {
            reply,
            intent: prepared.intent,
            sufficiency: prepared.sufficiency,
            mode: prepared.mode,
            retrieved: prepared.memories.len(),
            advisories: prepared.advisories,
            failed,
        })
    }

    /// Step 6: asks the generator. A blank reply degrades to a placeholder;
    /// a provider error leaves no answer at all.
    fn generate_answer(&self, request: &CompletionRequest) -> Outcome<ChatMessage> {
        match self.generator.complete(request) {
            Ok(text) if text.trim().is_empty() => {
                Outcome::degraded(ChatMessage::assistant(EMPTY_REPLY), "generator returned no text")
            },
            Ok(text) => Outcome::Ok(ChatMessage::assistant(text)),
            Err(e) => {
                tracing::error!(error = %e, "Answer generation failed");
                metrics::counter!("chat_generation_failures_total").increment(1);
                Outcome::Failed(e.to_string())
            },
        }
    }

    /// Starts a question, superseding any in flight.
    pub fn begin(&self) -> QueryTicket {
        self.sequencer.issue()
    }

    /// Answers for `ticket`; `Ok(None)` if a newer question started meanwhile.
    ///
    /// # Errors
    ///
    /// Same as [`ChatService::ask`].
    pub fn ask_with_ticket(
        &self,
        ticket: QueryTicket,
        message: &str,
        history: &[ChatMessage],
        semantic: bool,
    ) -> Result<Option<ChatTurn>> {
        let turn = self.ask(message, history, semantic)?;
        Ok(self.sequencer.accept(ticket, turn))
    }
}

/// Unwraps an outcome, recording any fallback reason.
fn take_value<T>(outcome: Outcome<T>, fallback: T, advisories: &mut Vec<String>) -> T {
    if let Some(reason) = outcome.reason() {
        advisories.push(reason.to_string());
    }
    outcome.into_value().unwrap_or(fallback)
}

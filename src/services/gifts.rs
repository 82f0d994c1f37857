//! Gift idea generation.

use super::MemoryStore;
use crate::llm::{CompletionRequest, LlmProvider, parse_json_object};
use crate::models::{Category, MemoryRecord};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Reverse;
use std::sync::Arc;

/// Default number of memories sent with a gift request.
pub const DEFAULT_CANDIDATE_LIMIT: usize = 80;

const GIFT_MAX_TOKENS: u32 = 1600;
const GIFT_TEMPERATURE: f32 = 0.2;

const GIFT_SYSTEM_PROMPT: &str = "You generate gift ideas from a user memory list.\n\
ONLY use provided memories. Never invent facts.\n\
Prefer recurring tags/themes when picking ideas.\n\
Return 5-8 ideas with a mix of budget and effort.\n\
Return STRICT JSON only and exactly this top-level schema:\n\
{\"ideas\":[{\"title\":\"\",\"why\":\"\",\"priceRange\":\"\",\"effort\":\"low|medium|high\",\"relatedMemories\":[\"memoryIdOrSnippet\"]}],\"followUps\":[\"\"]}";

/// A memory as sent to the gift generator. Carries no vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftCandidate {
    /// Memory id.
    pub id: String,
    /// Category.
    pub category: Category,
    /// Memory text.
    pub text: String,
    /// Tags.
    pub tags: Vec<String>,
    /// Creation timestamp, as stored.
    pub created_at: String,
}

impl From<&MemoryRecord> for GiftCandidate {
    fn from(memory: &MemoryRecord) -> Self {
        Self {
            id: memory.id.to_string(),
            category: memory.category,
            text: memory.text.clone(),
            tags: memory.tags.clone(),
            created_at: memory.created_at.to_string(),
        }
    }
}

/// Picks at most `limit` memories for a gift request.
///
/// Gift, favorite and activity memories come first; within each tier the
/// newest come first.
#[must_use]
pub fn select_candidates(memories: &[MemoryRecord], limit: usize) -> Vec<GiftCandidate> {
    let mut ordered: Vec<&MemoryRecord> = memories.iter().collect();
    ordered.sort_by_key(|m| (Reverse(m.category.is_gift_priority()), Reverse(m.created_at.millis())));
    ordered
        .into_iter()
        .take(limit)
        .map(GiftCandidate::from)
        .collect()
}

/// Builds the gift question from the form fields.
///
/// Blank budget and timeframe fall back to `flexible` and
/// `no strict deadline`.
#[must_use]
pub fn gift_question(occasion: &str, budget: Option<&str>, timeframe: Option<&str>) -> String {
    let budget = budget.map(str::trim).filter(|b| !b.is_empty()).unwrap_or("flexible");
    let timeframe = timeframe
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("no strict deadline");
    format!("Suggest gift ideas for {}, budget {budget}, timeframe {timeframe}.", occasion.trim())
}

/// Effort a gift takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    /// Little effort.
    Low,
    /// Some planning.
    Medium,
    /// Significant effort.
    High,
}

impl Effort {
    /// Parses an effort label; anything else is `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    /// Returns the label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// One suggested gift.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftIdea {
    /// Short title.
    pub title: String,
    /// Why it fits.
    pub why: String,
    /// Price range, free text.
    pub price_range: String,
    /// Effort, when the generator gave a known label.
    pub effort: Option<Effort>,
    /// Memory ids or snippets backing the idea.
    pub related_memories: Vec<String>,
}

impl GiftIdea {
    fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let text = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Some(Self {
            title: text("title"),
            why: text("why"),
            price_range: text("priceRange"),
            effort: object.get("effort").and_then(Value::as_str).and_then(Effort::parse),
            related_memories: string_list(object.get("relatedMemories")),
        })
    }
}

/// Parsed generator output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftIdeas {
    /// Suggestions.
    pub ideas: Vec<GiftIdea>,
    /// Questions that would sharpen the suggestions.
    pub follow_ups: Vec<String>,
}

impl GiftIdeas {
    /// Reads ideas and follow-ups from the JSON object in a reply.
    ///
    /// Missing or malformed lists become empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the reply holds no parseable JSON object.
    pub fn from_reply(reply: &str) -> Result<Self> {
        let parsed = parse_json_object("gift_ideas", reply)?;
        let ideas = parsed
            .get("ideas")
            .and_then(Value::as_array)
            .map(|ideas| ideas.iter().filter_map(GiftIdea::from_value).collect())
            .unwrap_or_default();
        Ok(Self {
            ideas,
            follow_ups: string_list(parsed.get("followUps")),
        })
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Generates gift ideas from stored memories.
pub struct GiftIdeaService {
    generator: Arc<dyn LlmProvider>,
    store: MemoryStore,
    candidate_limit: usize,
}

impl GiftIdeaService {
    /// Creates the service.
    #[must_use]
    pub fn new(generator: Arc<dyn LlmProvider>, store: MemoryStore) -> Self {
        Self {
            generator,
            store,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
        }
    }

    /// Sets how many memories are sent.
    #[must_use]
    pub const fn with_candidate_limit(mut self, limit: usize) -> Self {
        self.candidate_limit = limit;
        self
    }

    /// Generates ideas for `question` from the store's memories.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty question, or an operation
    /// failure if generation fails or the reply holds no JSON object.
    pub fn generate(&self, question: &str) -> Result<GiftIdeas> {
        if question.trim().is_empty() {
            return Err(Error::InvalidInput("question is required".to_string()));
        }

        let candidates = select_candidates(&self.store.snapshot(), self.candidate_limit);
        let count = candidates.len();
        let payload = serde_json::json!({
            "question": question,
            "memories": candidates,
        });

        let request = CompletionRequest::single(GIFT_SYSTEM_PROMPT, payload.to_string())
            .with_max_tokens(GIFT_MAX_TOKENS)
            .with_temperature(GIFT_TEMPERATURE);

        tracing::info!(candidates = count, "Requesting gift ideas");
        let reply = self.generator.complete(&request).inspect_err(|e| {
            metrics::counter!("gift_idea_failures_total").increment(1);
            tracing::error!(error = %e, "Gift idea generation failed");
        })?;

        GiftIdeas::from_reply(&reply)
    }
}

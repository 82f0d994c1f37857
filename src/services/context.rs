//! Prompt assembly for answer generation.
//!
//! Renders retrieved memories into the context block, wraps it in the system
//! prompt for the chosen [`ResponseMode`], and builds the conversation sent to
//! the generator. Output is byte-stable for the same input.

use crate::models::{Category, ChatMessage, MemoryRecord};
use crate::routing::{Intent, ResponseMode, Sufficiency};
use std::fmt::Write as _;

/// Context rendered when nothing was retrieved.
pub const EMPTY_CONTEXT: &str = "Memory Database: (no relevant memories retrieved)";

const PERSONA: &str = "You are a helpful assistant with access to a personal memory database about someone special in the user's life.";

const CORE_BEHAVIOR: &str = "Core behavior:\n\
- Use memories when relevant.\n\
- If memories are insufficient, provide helpful general suggestions.\n\
- Do not repeatedly restate memory entries when they do not answer the question.\n\
- Never pretend a business recommendation came from memory unless explicitly stored.\n\
- Be conversational, practical, and warm.";

const WORLD_INSTRUCTION: &str = "For this answer, prioritize general world knowledge and practical recommendations. Mention memory limitations only if directly helpful.";

const HYBRID_INSTRUCTION: &str = "For this answer, incorporate relevant memory details naturally, then supplement with useful general knowledge where helpful.";

/// Groups memories by category in first-appearance order and numbers them.
///
/// ```text
/// Memory Database:
///
/// FOOD:
/// 1. Loves sushi [Tags: dinner]
///
/// ```
#[must_use]
pub fn build_context(memories: &[MemoryRecord]) -> String {
    if memories.is_empty() {
        return EMPTY_CONTEXT.to_string();
    }

    let mut groups: Vec<(Category, Vec<&MemoryRecord>)> = Vec::new();
    for memory in memories {
        match groups.iter_mut().find(|(c, _)| *c == memory.category) {
            Some((_, items)) => items.push(memory),
            None => groups.push((memory.category, vec![memory])),
        }
    }

    let mut context = String::from("Memory Database:\n\n");
    for (category, items) in groups {
        let _ = writeln!(context, "{}:", category.as_str().to_uppercase());
        for (index, item) in items.iter().enumerate() {
            let _ = write!(context, "{}. {}", index + 1, item.text);
            if !item.tags.is_empty() {
                let _ = write!(context, " [Tags: {}]", item.tags.join(", "));
            }
            context.push('\n');
        }
        context.push('\n');
    }
    context
}

/// Builds the generator's system prompt.
#[must_use]
pub fn build_system_prompt(
    mode: ResponseMode,
    context: &str,
    intent: Intent,
    sufficiency: Sufficiency,
) -> String {
    let instruction = match mode {
        ResponseMode::World => WORLD_INSTRUCTION,
        ResponseMode::Hybrid => HYBRID_INSTRUCTION,
    };

    let routing = format!(
        "Routing mode: {mode}\nOriginal intent: {intent}\nMemory sufficiency: {sufficiency}"
    );

    [
        PERSONA,
        "",
        CORE_BEHAVIOR,
        "",
        routing.as_str(),
        "",
        instruction,
        "",
        context,
    ]
    .join("\n")
}

/// Replayable history followed by the latest user message.
#[must_use]
pub fn build_conversation(history: &[ChatMessage], latest: &str) -> Vec<ChatMessage> {
    history
        .iter()
        .filter(|m| m.is_replayable())
        .cloned()
        .chain(std::iter::once(ChatMessage::user(latest)))
        .collect()
}

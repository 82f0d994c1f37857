//! Coercion of persisted or imported JSON into typed records.
//!
//! Normalization never fails: anything unusable is replaced by a default so
//! older or hand-edited data still loads.

use crate::models::{
    Category, ChatMessage, ChatRole, MemoryId, MemoryRecord, Timestamp, dedupe_tags,
    is_valid_embedding,
};
use serde_json::Value;

/// Coerces one raw JSON value into a [`MemoryRecord`].
///
/// | Field | Rule |
/// |-------|------|
/// | `id` | string or number kept as text; missing or empty gets a fresh id |
/// | `category` | unknown or missing becomes `other` |
/// | `text` | non-string becomes `""` |
/// | `tags` | non-strings dropped, duplicates removed, non-array is empty |
/// | `date` | non-string or missing becomes now |
/// | `embedding` | kept only when it is a valid vector |
#[must_use]
pub fn normalize(raw: &Value) -> MemoryRecord {
    let id = match raw.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => MemoryId::new(s.as_str()),
        Some(Value::Number(n)) => MemoryId::new(n.to_string()),
        _ => MemoryId::generate(),
    };

    let category = raw
        .get("category")
        .and_then(Value::as_str)
        .and_then(Category::parse)
        .unwrap_or_default();

    let text = raw
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let tags = raw
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let created_at = raw
        .get("date")
        .and_then(Value::as_str)
        .map_or_else(Timestamp::now, Timestamp::new);

    let mut record = MemoryRecord {
        id,
        category,
        text,
        tags: dedupe_tags(tags),
        created_at,
        embedding: None,
        embedding_model: None,
    };

    if let Some(vector) = raw.get("embedding").and_then(parse_vector)
        && is_valid_embedding(&vector)
    {
        record.embedding = Some(vector);
        record.embedding_model = raw
            .get("embeddingModel")
            .and_then(Value::as_str)
            .map(str::to_string);
    }

    record
}

fn parse_vector(value: &Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| {
            #[allow(clippy::cast_possible_truncation)]
            v.as_f64().map(|f| f as f32)
        })
        .collect()
}

/// Normalizes a JSON array of records; any other shape yields nothing.
#[must_use]
pub fn normalize_all(raw: &Value) -> Vec<MemoryRecord> {
    raw.as_array()
        .map(|items| items.iter().map(normalize).collect())
        .unwrap_or_default()
}

/// Keeps history entries with a known role and string content.
#[must_use]
pub fn filter_history(raw: &Value) -> Vec<ChatMessage> {
    raw.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let role = item.get("role").and_then(Value::as_str).and_then(ChatRole::parse)?;
                    let content = item.get("content").and_then(Value::as_str)?;
                    Some(ChatMessage {
                        role,
                        content: content.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

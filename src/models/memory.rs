//! Memory records and identifiers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of components in a memory embedding.
pub const EMBEDDING_DIMENSIONS: usize = 128;

/// Unique identifier for a memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryId(String);

impl MemoryId {
    /// Creates a new memory ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh, time-ordered identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MemoryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MemoryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Category a memory is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Gift wishes and past presents.
    Gifts,
    /// Places visited or wanted.
    Travel,
    /// Dishes, restaurants, dietary notes.
    Food,
    /// Hobbies and things to do together.
    Activities,
    /// Favorite things of any kind.
    Favorites,
    /// Shared moments.
    Memories,
    /// Anything else.
    #[default]
    Other,
}

impl Category {
    /// Returns all categories in display order.
    #[must_use]
    pub const fn all() -> [Self; 7] {
        [
            Self::Gifts,
            Self::Travel,
            Self::Food,
            Self::Activities,
            Self::Favorites,
            Self::Memories,
            Self::Other,
        ]
    }

    /// Parses a category name (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gifts" => Some(Self::Gifts),
            "travel" => Some(Self::Travel),
            "food" => Some(Self::Food),
            "activities" => Some(Self::Activities),
            "favorites" => Some(Self::Favorites),
            "memories" => Some(Self::Memories),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Returns the string representation used in serialization.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gifts => "gifts",
            Self::Travel => "travel",
            Self::Food => "food",
            Self::Activities => "activities",
            Self::Favorites => "favorites",
            Self::Memories => "memories",
            Self::Other => "other",
        }
    }

    /// Whether this category is preferred when picking gift candidates.
    #[must_use]
    pub const fn is_gift_priority(&self) -> bool {
        matches!(self, Self::Gifts | Self::Favorites | Self::Activities)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Offset-less layouts accepted when reading hand-edited imports.
const NAIVE_DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Creation time of a memory.
///
/// Keeps the persisted string untouched so exports round-trip byte-for-byte.
/// RFC 3339 is the canonical form; offset-less date-times and bare dates are
/// read as UTC. Strings that do not parse sort as the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    /// Wraps a raw timestamp string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The current time, millisecond precision, `Z` suffix.
    #[must_use]
    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    /// Returns the raw string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Milliseconds since the Unix epoch, or 0 when unparsable.
    #[must_use]
    pub fn millis(&self) -> i64 {
        let raw = self.0.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return dt.timestamp_millis();
        }
        for format in NAIVE_DATE_TIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return naive.and_utc().timestamp_millis();
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map_or(0, |naive| naive.and_utc().timestamp_millis())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored memory entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    /// Unique identifier.
    pub id: MemoryId,
    /// Category the memory is filed under.
    pub category: Category,
    /// The memory content.
    pub text: String,
    /// Tags, unique, in insertion order.
    pub tags: Vec<String>,
    /// Creation timestamp.
    #[serde(rename = "date")]
    pub created_at: Timestamp,
    /// Semantic vector, [`EMBEDDING_DIMENSIONS`] finite components.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Model that produced `embedding`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
}

impl MemoryRecord {
    /// Creates a new record with a fresh id and the current time.
    #[must_use]
    pub fn new(category: Category, text: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            id: MemoryId::generate(),
            category,
            text: text.into(),
            tags: dedupe_tags(tags),
            created_at: Timestamp::now(),
            embedding: None,
            embedding_model: None,
        }
    }

    /// Sets the identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<MemoryId>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the creation timestamp.
    #[must_use]
    pub fn with_created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = created_at;
        self
    }

    /// Attaches an embedding.
    #[must_use]
    pub fn with_embedding(mut self, vector: Vec<f32>, model: impl Into<String>) -> Self {
        self.embedding = Some(vector);
        self.embedding_model = Some(model.into());
        self
    }

    /// Whether the stored embedding can be used for similarity ranking.
    #[must_use]
    pub fn has_valid_embedding(&self) -> bool {
        self.embedding.as_deref().is_some_and(is_valid_embedding)
    }

    /// Drops the stored embedding and its model label.
    pub fn clear_embedding(&mut self) {
        self.embedding = None;
        self.embedding_model = None;
    }

    /// Text sent to the embedding service: `category | tags | text`.
    #[must_use]
    pub fn embedding_input(&self) -> String {
        format!(
            "{} | {} | {}",
            self.category,
            self.tags.join(", "),
            self.text
        )
    }

    /// Lower-cased haystack used by keyword ranking.
    #[must_use]
    pub fn searchable_text(&self) -> String {
        let mut haystack = String::with_capacity(self.text.len() + 32);
        haystack.push_str(&self.text);
        haystack.push(' ');
        haystack.push_str(self.category.as_str());
        for tag in &self.tags {
            haystack.push(' ');
            haystack.push_str(tag);
        }
        haystack.to_lowercase()
    }

    /// Whether the record takes part in retrieval.
    #[must_use]
    pub fn is_retrievable(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Returns true for a vector of exactly [`EMBEDDING_DIMENSIONS`] finite values.
#[must_use]
pub fn is_valid_embedding(vector: &[f32]) -> bool {
    vector.len() == EMBEDDING_DIMENSIONS && vector.iter().all(|v| v.is_finite())
}

/// Removes duplicate tags, keeping the first occurrence.
#[must_use]
pub fn dedupe_tags(tags: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !unique.contains(&tag) {
            unique.push(tag);
        }
    }
    unique
}

/// Splits a comma-separated tag list as typed by a user.
#[must_use]
pub fn parse_tag_list(input: &str) -> Vec<String> {
    dedupe_tags(
        input
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

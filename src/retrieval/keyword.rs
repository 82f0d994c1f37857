//! Keyword ranking.

use crate::models::{MemoryRecord, RankedCandidate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Reverse;

/// Characters that never form part of a token.
static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"[^a-z0-9]+").expect("static regex: non-alphanumeric run")
});

/// Tokens shorter than this are ignored.
pub const MIN_TOKEN_LEN: usize = 3;

/// Splits a query into distinct lower-case tokens of at least
/// [`MIN_TOKEN_LEN`] ASCII alphanumerics, in first-appearance order.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let spaced = NON_ALPHANUMERIC.replace_all(&lowered, " ");
    let mut tokens: Vec<String> = Vec::new();
    for token in spaced.split_whitespace() {
        if token.len() >= MIN_TOKEN_LEN && !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }
    tokens
}

/// Token-overlap ranker with a recency fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordRanker {
    /// Maximum matches returned.
    pub limit: usize,
    /// Cap on the recency fallback when nothing matches.
    pub fallback_limit: usize,
}

impl Default for KeywordRanker {
    fn default() -> Self {
        Self {
            limit: 30,
            fallback_limit: 12,
        }
    }
}

impl KeywordRanker {
    /// Creates a ranker with the given match limit.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Ranks memories by how many distinct query tokens they contain.
    ///
    /// Memories with blank text are excluded. When at least one memory
    /// matches, only matches are returned (best first, newest first on ties,
    /// at most `limit`). Otherwise the `min(limit, fallback_limit)` most
    /// recent memories are returned with score 0.
    #[must_use]
    pub fn rank(&self, query: &str, memories: &[MemoryRecord]) -> Vec<RankedCandidate> {
        let tokens = tokenize(query);

        let mut scored: Vec<(usize, i64, &MemoryRecord)> = memories
            .iter()
            .filter(|m| m.is_retrievable())
            .map(|memory| {
                let haystack = memory.searchable_text();
                let score = tokens
                    .iter()
                    .filter(|token| haystack.contains(token.as_str()))
                    .count();
                (score, memory.created_at.millis(), memory)
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

        let matched = scored.first().is_some_and(|(score, _, _)| *score > 0);
        let take = if matched {
            self.limit
        } else {
            self.limit.min(self.fallback_limit)
        };

        scored
            .into_iter()
            .filter(|(score, _, _)| !matched || *score > 0)
            .take(take)
            .map(|(score, _, memory)| {
                #[allow(clippy::cast_precision_loss)]
                let score = score as f32;
                RankedCandidate::new(memory.clone(), score)
            })
            .collect()
    }
}

/// Ranks with the default limits.
#[must_use]
pub fn rank_keyword(query: &str, memories: &[MemoryRecord], limit: usize) -> Vec<RankedCandidate> {
    KeywordRanker::with_limit(limit).rank(query, memories)
}

/// Sorts newest first, ties keeping their input order.
pub fn sort_newest_first(memories: &mut [MemoryRecord]) {
    memories.sort_by_key(|m| Reverse(m.created_at.millis()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Timestamp};

    fn memory(id: &str, category: Category, text: &str, tags: &[&str], date: &str) -> MemoryRecord {
        MemoryRecord::new(category, text, tags.iter().map(|t| (*t).to_string()).collect())
            .with_id(id)
            .with_created_at(Timestamp::new(date))
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("What's her FAVORITE sushi? sushi!"),
            vec!["what", "her", "favorite", "sushi"]
        );
        assert!(tokenize("a an to").is_empty());
        assert_eq!(tokenize("café-latte"), vec!["caf", "latte"]);
    }

    #[test]
    fn test_sushi_scenario() {
        let memories = vec![
            memory("1", Category::Food, "Loves sushi", &[], "2024-01-02T00:00:00.000Z"),
            memory("2", Category::Travel, "Went to Rome", &[], "2024-01-03T00:00:00.000Z"),
        ];

        let ranked = rank_keyword("sushi", &memories, 30);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].memory.id.as_str(), "1");
        assert!((ranked[0].score - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_matches_category_and_tags() {
        let memories = vec![
            memory("1", Category::Food, "Pho on Sundays", &["vietnamese"], "2024-01-01T00:00:00.000Z"),
            memory("2", Category::Gifts, "Wants a scarf", &[], "2024-01-01T00:00:00.000Z"),
        ];

        let ranked = rank_keyword("vietnamese food ideas", &memories, 30);

        assert_eq!(ranked.len(), 1);
        assert!((ranked[0].score - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_ties_break_newest_first() {
        let memories = vec![
            memory("old", Category::Food, "sushi downtown", &[], "2023-01-01T00:00:00.000Z"),
            memory("new", Category::Food, "sushi uptown", &[], "2024-01-01T00:00:00.000Z"),
            memory("best", Category::Food, "sushi downtown omakase", &[], "2022-01-01T00:00:00.000Z"),
        ];

        let ranked = rank_keyword("sushi omakase", &memories, 30);
        let ids: Vec<_> = ranked.iter().map(|c| c.memory.id.as_str()).collect();

        assert_eq!(ids, vec!["best", "new", "old"]);
    }

    #[test]
    fn test_no_match_falls_back_to_recent() {
        let memories: Vec<_> = (0..20)
            .map(|i| {
                memory(
                    &i.to_string(),
                    Category::Other,
                    "note",
                    &[],
                    &format!("2024-01-{:02}T00:00:00.000Z", i + 1),
                )
            })
            .collect();

        let ranked = rank_keyword("zebra", &memories, 30);

        assert_eq!(ranked.len(), 12);
        assert_eq!(ranked[0].memory.id.as_str(), "19");
        assert!(ranked.iter().all(|c| c.score.abs() < f32::EPSILON));

        assert_eq!(rank_keyword("zebra", &memories, 5).len(), 5);
    }

    #[test]
    fn test_blank_text_excluded() {
        let memories = vec![
            memory("blank", Category::Food, "   ", &["sushi"], "2024-01-01T00:00:00.000Z"),
            memory("real", Category::Food, "ramen", &[], "2023-01-01T00:00:00.000Z"),
        ];

        let ranked = rank_keyword("sushi", &memories, 30);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].memory.id.as_str(), "real");
    }

    #[test]
    fn test_match_limit() {
        let memories: Vec<_> = (0..40)
            .map(|i| memory(&i.to_string(), Category::Food, "sushi", &[], "2024-01-01T00:00:00.000Z"))
            .collect();
        assert_eq!(rank_keyword("sushi", &memories, 30).len(), 30);
    }
}

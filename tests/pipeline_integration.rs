//! End-to-end tests of the question pipeline, browsing and persistence.
//!
//! Every external service is replaced by a stub:
//! - `StubRouter` answers classification and sufficiency prompts
//! - `StubGenerator` records the final request and returns a canned reply
//! - `VocabularyEmbedder` maps a fixed vocabulary onto vector axes

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use memory_lane::config::RetrievalConfig;
use memory_lane::embedding::{Embedder, EmbeddingBatch};
use memory_lane::io::{export_json, import_into};
use memory_lane::llm::{CompletionRequest, LlmProvider};
use memory_lane::models::{EMBEDDING_DIMENSIONS, SearchMode};
use memory_lane::retrieval::{BrowseQuery, rank_keyword};
use memory_lane::services::GENERATION_FAILURE_REPLY;
use memory_lane::storage::{ClientState, FileKeyValueStore};
use memory_lane::{
    Category, ChatMessage, ChatService, Error, GiftIdeaService, Intent, MemoryRecord, MemoryStore,
    ResponseMode, Result, SearchSession, Sufficiency, Timestamp,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

const VOCABULARY: [&str; 6] = ["sushi", "rome", "kyoto", "scarf", "olives", "hiking"];

/// Puts one unit on the axis of each known word.
struct VocabularyEmbedder {
    calls: AtomicUsize,
    available: AtomicBool,
}

impl VocabularyEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            available: AtomicBool::new(true),
        }
    }

    fn vector(text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let mut vector = vec![0.0; EMBEDDING_DIMENSIONS];
        for (axis, word) in VOCABULARY.iter().enumerate() {
            if lowered.contains(word) {
                vector[axis] = 1.0;
            }
        }
        vector
    }
}

impl Embedder for VocabularyEmbedder {
    fn name(&self) -> &'static str {
        "vocabulary"
    }

    fn embed_batch(&self, inputs: &[String]) -> Result<EmbeddingBatch> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            return Err(Error::failed("embed_batch", "status 503"));
        }
        Ok(EmbeddingBatch {
            vectors: inputs.iter().map(|input| Self::vector(input)).collect(),
            model: "vocabulary-v1".to_string(),
        })
    }
}

struct StubRouter {
    intent: &'static str,
    verdict: &'static str,
    calls: AtomicUsize,
}

impl StubRouter {
    fn new(intent: &'static str, verdict: &'static str) -> Arc<Self> {
        Arc::new(Self {
            intent,
            verdict,
            calls: AtomicUsize::new(0),
        })
    }
}

impl LlmProvider for StubRouter {
    fn name(&self) -> &'static str {
        "stub-router"
    }

    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.system.starts_with("Classify") {
            Ok(self.intent.to_string())
        } else {
            Ok(self.verdict.to_string())
        }
    }
}

struct StubGenerator {
    reply: Option<String>,
    last: Mutex<Option<CompletionRequest>>,
}

impl StubGenerator {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            last: Mutex::new(None),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            last: Mutex::new(None),
        })
    }

    fn last_request(&self) -> CompletionRequest {
        self.last.lock().unwrap().clone().expect("generator was not called")
    }
}

impl LlmProvider for StubGenerator {
    fn name(&self) -> &'static str {
        "stub-generator"
    }

    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        *self.last.lock().unwrap() = Some(request.clone());
        self.reply
            .clone()
            .ok_or_else(|| Error::failed("anthropic_request", "connect error"))
    }
}

fn memory(id: &str, category: Category, text: &str, tags: &[&str], date: &str) -> MemoryRecord {
    MemoryRecord::new(category, text, tags.iter().map(|t| (*t).to_string()).collect())
        .with_id(id)
        .with_created_at(Timestamp::new(date))
}

fn sample_memories() -> Vec<MemoryRecord> {
    vec![
        memory("1", Category::Food, "Loves sushi", &["dinner"], "2024-01-01T00:00:00.000Z"),
        memory("2", Category::Travel, "Went to Rome", &[], "2024-02-01T00:00:00.000Z"),
        memory("3", Category::Travel, "Dreams of Kyoto", &["someday"], "2024-03-01T00:00:00.000Z"),
        memory("4", Category::Gifts, "Wants a wool scarf", &[], "2024-04-01T00:00:00.000Z"),
    ]
}

fn store_with(embedder: Arc<VocabularyEmbedder>) -> MemoryStore {
    MemoryStore::new(embedder).with_records(sample_memories())
}

fn chat(
    router: Arc<StubRouter>,
    generator: Arc<StubGenerator>,
    store: MemoryStore,
) -> ChatService {
    ChatService::new(router, generator, store, &RetrievalConfig::default())
}

// ============================================================================
// Question pipeline
// ============================================================================

#[test]
fn test_sushi_scenario_keyword_ranking() {
    let memories = vec![
        memory("a", Category::Food, "Loves sushi", &["dinner"], "2024-01-01T00:00:00.000Z"),
        memory("b", Category::Travel, "Went to Rome", &[], "2024-02-01T00:00:00.000Z"),
    ];

    let ranked = rank_keyword("sushi", &memories, 30);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].memory.id.as_str(), "a");
    assert!((ranked[0].score - 1.0).abs() < f32::EPSILON);
}

#[test]
fn test_memory_question_uses_retrieved_context() {
    let router = StubRouter::new("MEMORY", "ENOUGH");
    let generator = StubGenerator::replying("She loves sushi.");
    let store = store_with(Arc::new(VocabularyEmbedder::new()));
    let chat = chat(router.clone(), generator.clone(), store);

    let turn = chat.ask("Which dinner does she love? sushi?", &[], false).unwrap();

    assert_eq!(turn.intent, Intent::Memory);
    assert_eq!(turn.sufficiency, Sufficiency::Enough);
    assert_eq!(turn.mode, ResponseMode::Hybrid);
    assert_eq!(turn.retrieved, 1);
    assert_eq!(turn.reply, ChatMessage::assistant("She loves sushi."));
    assert_eq!(router.calls.load(Ordering::SeqCst), 2);

    let request = generator.last_request();
    assert!(request.system.contains("Loves sushi"));
    assert!(!request.system.contains("Went to Rome"));
    assert_eq!(
        request.messages.last(),
        Some(&ChatMessage::user("Which dinner does she love? sushi?"))
    );
}

#[test]
fn test_world_question_skips_retrieval_and_sufficiency() {
    let router = StubRouter::new("WORLD", "ENOUGH");
    let generator = StubGenerator::replying("The Louvre opens at nine.");
    let embedder = Arc::new(VocabularyEmbedder::new());
    let chat = chat(router.clone(), generator.clone(), store_with(embedder.clone()));

    let turn = chat.ask("When does the Louvre open?", &[], true).unwrap();

    assert_eq!(turn.mode, ResponseMode::World);
    assert_eq!(turn.sufficiency, Sufficiency::NotNeeded);
    assert_eq!(turn.retrieved, 0);
    assert_eq!(router.calls.load(Ordering::SeqCst), 1);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert!(
        generator
            .last_request()
            .system
            .contains("(no relevant memories retrieved)")
    );
}

#[test]
fn test_unparseable_intent_falls_back_to_hybrid() {
    let router = StubRouter::new("BANANA", "NOT_ENOUGH");
    let generator = StubGenerator::replying("Maybe a trip to Kyoto?");
    let chat = chat(router, generator, store_with(Arc::new(VocabularyEmbedder::new())));

    let turn = chat.ask("Plan something for our Kyoto dream", &[], false).unwrap();

    assert_eq!(turn.intent, Intent::Hybrid);
    assert_eq!(turn.sufficiency, Sufficiency::NotEnough);
    assert_eq!(turn.mode, ResponseMode::Hybrid);
    assert!(!turn.advisories.is_empty());
}

#[test]
fn test_generation_failure_still_completes_turn() {
    let router = StubRouter::new("HYBRID", "ENOUGH");
    let chat = chat(
        router,
        StubGenerator::failing(),
        store_with(Arc::new(VocabularyEmbedder::new())),
    );

    let turn = chat.ask("What should we cook tonight?", &[], false).unwrap();

    assert!(turn.failed);
    assert_eq!(turn.reply, ChatMessage::system(GENERATION_FAILURE_REPLY));
}

#[test]
fn test_semantic_question_ranks_by_meaning() {
    let embedder = Arc::new(VocabularyEmbedder::new());
    let store = store_with(embedder.clone());
    let generator = StubGenerator::replying("Kyoto in spring.");
    let chat = chat(StubRouter::new("MEMORY", "ENOUGH"), generator.clone(), store.clone());

    let turn = chat.ask("kyoto", &[], true).unwrap();
    assert!(turn.advisories.is_empty());
    assert_eq!(turn.retrieved, 4);

    let system = generator.last_request().system;
    let kyoto = system.find("Dreams of Kyoto").unwrap();
    let sushi = system.find("Loves sushi").unwrap();
    assert!(kyoto < sushi);

    assert!(store.snapshot().iter().all(MemoryRecord::has_valid_embedding));
}

#[test]
fn test_semantic_outage_falls_back_to_keyword() {
    let embedder = Arc::new(VocabularyEmbedder::new());
    embedder.available.store(false, Ordering::SeqCst);
    let generator = StubGenerator::replying("ok");
    let chat = chat(
        StubRouter::new("MEMORY", "ENOUGH"),
        generator.clone(),
        store_with(embedder),
    );

    let turn = chat.ask("sushi", &[], true).unwrap();

    assert_eq!(turn.retrieved, 1);
    assert_eq!(turn.advisories.len(), 1);
    assert!(turn.advisories[0].contains("keyword"));
    assert!(!turn.failed);
}

// ============================================================================
// Browsing
// ============================================================================

#[test]
fn test_semantic_browse_and_recovery() {
    let embedder = Arc::new(VocabularyEmbedder::new());
    let store = store_with(embedder.clone());
    let session = SearchSession::new(store);

    embedder.available.store(false, Ordering::SeqCst);
    let results = session.search(&BrowseQuery::new("scarf"), SearchMode::Semantic);
    assert_eq!(results.len(), 1);
    assert!(session.advisory().is_some());

    embedder.available.store(true, Ordering::SeqCst);
    let results = session.search(&BrowseQuery::new("scarf"), SearchMode::Semantic);
    assert_eq!(results.len(), 4);
    assert_eq!(results[0].id.as_str(), "4");
    assert!(session.advisory().is_none());
}

#[test]
fn test_edit_invalidates_embedding() {
    let embedder = Arc::new(VocabularyEmbedder::new());
    let store = store_with(embedder.clone());
    store.ensure_all_embeddings().unwrap();
    let calls = embedder.calls.load(Ordering::SeqCst);

    let id = memory_lane::MemoryId::new("2");
    let edited = store
        .update(&id, Category::Activities, "Went hiking near Rome", vec![])
        .unwrap();
    assert!(edited.embedding.is_none());
    let original = Timestamp::new("2024-02-01T00:00:00.000Z");
    assert_ne!(edited.created_at, original);
    assert!(edited.created_at.millis() > original.millis());

    let session = SearchSession::new(store.clone());
    let results = session.search(&BrowseQuery::new("hiking"), SearchMode::Semantic);
    assert_eq!(results[0].id.as_str(), "2");
    assert_eq!(embedder.calls.load(Ordering::SeqCst), calls + 2);
    assert!(store.get(&id).unwrap().has_valid_embedding());
}

// ============================================================================
// Persistence and transfer
// ============================================================================

#[test]
fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let embedder = Arc::new(VocabularyEmbedder::new());

    {
        let state = ClientState::new(Arc::new(FileKeyValueStore::open(dir.path()).unwrap()));
        let store = store_with(embedder.clone());
        store.ensure_all_embeddings().unwrap();
        state.save_memories(&store.snapshot()).unwrap();
        state
            .save_history(&[ChatMessage::user("hi"), ChatMessage::assistant("hello")])
            .unwrap();
    }

    let state = ClientState::new(Arc::new(FileKeyValueStore::open(dir.path()).unwrap()));
    let memories = state.load_memories().unwrap();
    assert_eq!(memories.len(), 4);
    assert!(memories.iter().all(MemoryRecord::has_valid_embedding));
    assert_eq!(memories[0].embedding_model.as_deref(), Some("vocabulary-v1"));
    assert_eq!(state.load_history().unwrap().len(), 2);
}

#[test]
fn test_export_import_roundtrip() {
    let source = store_with(Arc::new(VocabularyEmbedder::new()));
    let json = export_json(&source.snapshot()).unwrap();

    let target = MemoryStore::new(Arc::new(VocabularyEmbedder::new()));
    assert_eq!(import_into(&target, &json).unwrap(), 4);

    for (before, after) in source.snapshot().iter().zip(target.snapshot().iter()) {
        assert_eq!(before.id, after.id);
        assert_eq!(before.category, after.category);
        assert_eq!(before.text, after.text);
        assert_eq!(before.tags, after.tags);
        assert_eq!(before.created_at, after.created_at);
    }
}

#[test]
fn test_malformed_import_leaves_store_unchanged() {
    let store = store_with(Arc::new(VocabularyEmbedder::new()));
    let before = store.snapshot();

    for payload in ["{\"memories\": []}", "[{\"text\": ", "42"] {
        let err = import_into(&store, payload).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)), "{payload}");
    }
    assert_eq!(store.snapshot(), before);
}

// ============================================================================
// Gift ideas
// ============================================================================

#[test]
fn test_gift_ideas_from_memories() {
    let reply = r#"Here you go:
{"ideas": [{"title": "Cashmere scarf", "why": "She wants a wool scarf", "priceRange": "$50-100",
"effort": "low", "relatedMemories": ["4"]}], "followUps": ["Favorite color?"]}"#;
    let generator = StubGenerator::replying(reply);
    let service = GiftIdeaService::new(
        generator.clone(),
        store_with(Arc::new(VocabularyEmbedder::new())),
    );

    let ideas = service.generate("Birthday gift under $100").unwrap();
    assert_eq!(ideas.ideas.len(), 1);
    assert_eq!(ideas.ideas[0].title, "Cashmere scarf");
    assert_eq!(ideas.ideas[0].related_memories, vec!["4".to_string()]);
    assert_eq!(ideas.follow_ups, vec!["Favorite color?".to_string()]);

    let request = generator.last_request();
    let payload = &request.messages[0].content;
    assert!(payload.contains("Wants a wool scarf"));
    assert!(payload.contains("Birthday gift under $100"));
}

#[test]
fn test_gift_ideas_without_json_fail() {
    let service = GiftIdeaService::new(
        StubGenerator::replying("I cannot help with that."),
        store_with(Arc::new(VocabularyEmbedder::new())),
    );
    assert!(service.generate("Anniversary").is_err());
}

//! Data models.
//!
//! Core types shared by the store, rankers, router and services.

mod chat;
mod memory;
mod outcome;
mod search;

pub use chat::{ChatMessage, ChatRole};
pub use memory::{
    Category, EMBEDDING_DIMENSIONS, MemoryId, MemoryRecord, Timestamp, dedupe_tags,
    is_valid_embedding, parse_tag_list,
};
pub use outcome::Outcome;
pub use search::{RankedCandidate, SearchMode, into_memories};

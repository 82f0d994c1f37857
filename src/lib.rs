//! # Memory Lane
//!
//! A personal memory keeper queried in natural language.
//!
//! Memory Lane stores small notes about someone important ("memories"), and
//! answers questions about them through an LLM gateway. The crate holds the
//! retrieval-and-routing core: which memories are relevant to a question, and
//! how the answer should be framed.
//!
//! ## Pipeline
//!
//! ```text
//! question ─► classify intent ─┬─ WORLD ───────────────────────────────┐
//!                              │                                       │
//!                              └─ MEMORY/HYBRID ─► rank memories        │
//!                                                   │                  │
//!                                                   └─► sufficiency ─► mode ─► context ─► generation
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use memory_lane::{ChatService, MemoryStore};
//!
//! let store = MemoryStore::new(embedder);
//! let chat = ChatService::new(router, generator, store.clone(), &config.retrieval);
//! let turn = chat.ask("What does she like for breakfast?", &history, false)?;
//! println!("{}", turn.reply.content);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod embedding;
pub mod io;
pub mod llm;
pub mod models;
pub mod observability;
pub mod retrieval;
pub mod routing;
pub mod services;
pub mod storage;

pub use config::MemoryLaneConfig;
pub use embedding::Embedder;
pub use llm::LlmProvider;
pub use models::{
    Category, ChatMessage, ChatRole, MemoryId, MemoryRecord, Outcome, RankedCandidate, Timestamp,
};
pub use routing::{Intent, ResponseMode, Sufficiency};
pub use services::{ChatService, GiftIdeaService, MemoryStore, SearchSession};

/// Error type for memory-lane operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Empty chat message or gift question, unknown memory id |
/// | `MalformedInput` | Import payload is not JSON or not an array |
/// | `OperationFailed` | HTTP transport errors, bad gateway payloads, file I/O |
/// | `Timeout` | An external call exceeded its time bound |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Input data could not be parsed into the expected shape.
    ///
    /// Raised before any mutation happens, so callers can rely on state
    /// being unchanged.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// An external call did not finish in time.
    #[error("operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The bound that was exceeded.
        timeout_ms: u64,
    },
}

impl Error {
    /// Shorthand for [`Error::OperationFailed`].
    pub fn failed(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for memory-lane operations.
pub type Result<T> = std::result::Result<T, Error>;

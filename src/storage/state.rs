//! Persisted client state: the memory collection and the chat history.

use super::KeyValueStore;
use crate::models::{ChatMessage, MemoryRecord};
use crate::services::{filter_history, normalize_all};
use crate::{Error, Result};
use serde_json::Value;
use std::sync::Arc;

/// Key holding the memory array.
pub const MEMORIES_KEY: &str = "memoryLaneData";

/// Key holding the chat history array.
pub const HISTORY_KEY: &str = "memoryLaneChatHistory";

/// Typed access to the persisted state.
#[derive(Clone)]
pub struct ClientState {
    backend: Arc<dyn KeyValueStore>,
}

impl ClientState {
    /// Wraps a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    fn load_array(&self, key: &str) -> Result<Value> {
        let Some(raw) = self.backend.get(key)? else {
            return Ok(Value::Array(Vec::new()));
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) if value.is_array() => Ok(value),
            Ok(_) => {
                tracing::warn!(key, "Stored state is not an array, loading empty");
                Ok(Value::Array(Vec::new()))
            },
            Err(e) => {
                tracing::warn!(key, error = %e, "Stored state is not valid JSON, loading empty");
                Ok(Value::Array(Vec::new()))
            },
        }
    }

    /// Loads and normalizes the memory collection.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend cannot be read.
    pub fn load_memories(&self) -> Result<Vec<MemoryRecord>> {
        Ok(normalize_all(&self.load_array(MEMORIES_KEY)?))
    }

    /// Saves the memory collection.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save_memories(&self, memories: &[MemoryRecord]) -> Result<()> {
        let json = serde_json::to_string(memories).map_err(|e| Error::failed("serialize_memories", e))?;
        self.backend.set(MEMORIES_KEY, &json)
    }

    /// Loads the chat history, dropping malformed entries.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend cannot be read.
    pub fn load_history(&self) -> Result<Vec<ChatMessage>> {
        Ok(filter_history(&self.load_array(HISTORY_KEY)?))
    }

    /// Saves the chat history.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save_history(&self, history: &[ChatMessage]) -> Result<()> {
        let json = serde_json::to_string(history).map_err(|e| Error::failed("serialize_history", e))?;
        self.backend.set(HISTORY_KEY, &json)
    }

    /// Starts a fresh conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be modified.
    pub fn clear_history(&self) -> Result<()> {
        self.backend.remove(HISTORY_KEY).map(|_| ())
    }
}

//! Storage backend trait.

use crate::Result;

/// A string key-value store holding serialized client state.
///
/// Backends are the authoritative copy of the memory collection and chat
/// history between runs.
pub trait KeyValueStore: Send + Sync {
    /// Reads a value. A missing key is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes a value. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be modified.
    fn remove(&self, key: &str) -> Result<bool>;
}

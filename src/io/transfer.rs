//! JSON export and all-or-nothing import.

use crate::models::MemoryRecord;
use crate::services::{MemoryStore, normalize};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde_json::Value;

/// Serializes the collection as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn export_json(memories: &[MemoryRecord]) -> Result<String> {
    serde_json::to_string_pretty(memories).map_err(|e| Error::failed("export_memories", e))
}

/// Suggested file name for an export taken on `date`.
#[must_use]
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("memory-lane-backup-{}.json", date.format("%Y-%m-%d"))
}

/// Parses an import payload into normalized records.
///
/// Every array element is normalized, so unknown categories, missing ids or
/// broken embeddings never reject the file. Only the payload shape can.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] if the payload is not JSON or is not an
/// array.
pub fn import_json(payload: &str) -> Result<Vec<MemoryRecord>> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| Error::MalformedInput(format!("import is not valid JSON: {e}")))?;

    let Value::Array(entries) = value else {
        return Err(Error::MalformedInput(
            "import must be a JSON array of memories".to_string(),
        ));
    };

    Ok(entries.iter().map(normalize).collect())
}

/// Replaces the store's collection with the payload's records.
///
/// Returns the number of imported records.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] as [`import_json`] does. The store is
/// only modified after the whole payload has been accepted.
pub fn import_into(store: &MemoryStore, payload: &str) -> Result<usize> {
    let records = import_json(payload)?;
    let count = records.len();
    store.replace_all(records);
    metrics::counter!("memory_imports_total").increment(1);
    tracing::info!(count, "Imported memories");
    Ok(count)
}

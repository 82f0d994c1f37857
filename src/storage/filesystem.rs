//! Filesystem-backed key-value store.
//!
//! Each key is one JSON file in the data directory. Writes go to a temporary
//! file in the same directory and are renamed into place, so a crash never
//! leaves a half-written collection behind.
//!
//! # Security
//!
//! Keys are validated to prevent path traversal, and reads are capped at
//! [`MAX_FILE_SIZE`].

use super::KeyValueStore;
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum file size for a stored value (16MB).
pub const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Key-value store writing one file per key.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    base_path: PathBuf,
}

impl FileKeyValueStore {
    /// Opens a store rooted at `base_path`, creating the directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).map_err(|e| {
            Error::failed("create_storage_dir", format!("{}: {e}", base_path.display()))
        })?;
        Ok(Self { base_path })
    }

    /// Returns the base path.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn value_path(&self, key: &str) -> Result<PathBuf> {
        if !is_safe_key(key) {
            return Err(Error::InvalidInput(format!(
                "Storage key contains invalid characters: {key}"
            )));
        }
        Ok(self.base_path.join(format!("{key}.json")))
    }
}

/// Only alphanumerics, dashes and underscores.
fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 255
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.value_path(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let metadata = fs::metadata(&path).map_err(|e| Error::failed("read_file_metadata", e))?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(Error::InvalidInput(format!(
                "Stored value exceeds maximum size of {MAX_FILE_SIZE} bytes: {}",
                path.display()
            )));
        }

        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| Error::failed("read_state_file", format!("{}: {e}", path.display())))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.value_path(key)?;
        let tmp_path = self
            .base_path
            .join(format!(".{key}.{}.tmp", uuid::Uuid::new_v4().simple()));

        fs::write(&tmp_path, value)
            .map_err(|e| Error::failed("write_state_file", format!("{}: {e}", tmp_path.display())))?;

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            Error::failed("rename_state_file", format!("{}: {e}", path.display()))
        })?;

        tracing::debug!(key, bytes = value.len(), "State written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let path = self.value_path(key)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| Error::failed("delete_state_file", e))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_get_remove() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::open(dir.path()).unwrap();

        assert_eq!(store.get("memoryLaneData").unwrap(), None);
        store.set("memoryLaneData", "[]").unwrap();
        assert_eq!(store.get("memoryLaneData").unwrap().as_deref(), Some("[]"));

        store.set("memoryLaneData", "[1]").unwrap();
        assert_eq!(store.get("memoryLaneData").unwrap().as_deref(), Some("[1]"));

        assert!(store.remove("memoryLaneData").unwrap());
        assert!(!store.remove("memoryLaneData").unwrap());
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::open(dir.path()).unwrap();
        store.set("k", "v").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["k.json".to_string()]);
    }

    #[test]
    fn test_path_traversal_protection() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::open(dir.path()).unwrap();

        assert!(store.get("../../etc/passwd").is_err());
        assert!(store.set("a/b", "x").is_err());
        assert!(store.set("", "x").is_err());
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileKeyValueStore::open(&nested).unwrap();
        assert!(store.base_path().is_dir());
    }
}

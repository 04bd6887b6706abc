//! Context storage.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

use monica_protocols::{ContextStore, StorageError};

/// In-memory context store.
pub struct MemoryContextStore {
    records: RwLock<HashMap<String, Value>>,
}

impl MemoryContextStore {
    /// Create a new memory store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryContextStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContextStore for MemoryContextStore {
    async fn save(&self, key: &str, value: Option<Value>) -> Result<(), StorageError> {
        validate_key(key)?;
        let mut records = self.records.write().await;
        match value {
            Some(value) => {
                records.insert(key.to_string(), value);
            }
            None => {
                records.remove(key);
            }
        }
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        validate_key(key)?;
        let records = self.records.read().await;
        Ok(records.get(key).cloned())
    }
}

/// File system based context store.
///
/// Each key is stored as one JSON document:
/// ```text
/// {storage_path}/
/// ├── {encoded_key}.json
/// └── ...
/// ```
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader never observes a half-written record.
pub struct FileContextStore {
    storage_path: PathBuf,
}

impl FileContextStore {
    /// Create a store rooted at `storage_path`, creating the directory if needed.
    pub async fn new(storage_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let storage_path = storage_path.into();
        fs::create_dir_all(&storage_path).await?;

        debug!("FileContextStore initialized at {:?}", storage_path);

        Ok(Self { storage_path })
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.storage_path.join(format!("{}.json", Self::encode_key(key)))
    }

    /// Encode a key into a file stem.
    ///
    /// Lowercase letters, digits, `-` and `_` pass through; every other byte,
    /// uppercase letters included, becomes `%XX`. Distinct keys never share a
    /// file, even on a case-insensitive filesystem.
    fn encode_key(key: &str) -> String {
        let mut encoded = String::with_capacity(key.len());
        for byte in key.bytes() {
            if byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-' || byte == b'_' {
                encoded.push(byte as char);
            } else {
                let _ = write!(encoded, "%{:02X}", byte);
            }
        }
        encoded
    }
}

#[async_trait]
impl ContextStore for FileContextStore {
    async fn save(&self, key: &str, value: Option<Value>) -> Result<(), StorageError> {
        validate_key(key)?;
        let path = self.record_path(key);

        let Some(value) = value else {
            match fs::remove_file(&path).await {
                Ok(()) => debug!("Cleared context '{}'", key),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            return Ok(());
        };

        let content = serde_json::to_string_pretty(&value)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &path).await?;

        debug!("Saved context '{}' to {:?}", key, path);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        validate_key(key)?;
        let path = self.record_path(key);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_str(&content)?))
    }
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.trim().is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

//! Context store protocol.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageError;

/// Key-value persistence keyed by project identifier.
///
/// At most one value exists per key; `save` overwrites. Saving `None` clears
/// the key, and a later `load` returns `None`.
#[async_trait]
pub trait ContextStore: Send + Sync {
    async fn save(&self, key: &str, value: Option<Value>) -> Result<(), StorageError>;

    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError>;
}

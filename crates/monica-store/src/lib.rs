//! # Monica Store
//!
//! Context storage backends keyed by project identifier.
//!
//! ## Backends
//!
//! - [`MemoryContextStore`] - process-local, used in tests and with `backend = "memory"`
//! - [`FileContextStore`] - one JSON document per project on disk

pub mod store;

use std::sync::Arc;

use monica_config::StorageConfig;
use monica_protocols::{ContextStore, StorageError};

pub use store::{FileContextStore, MemoryContextStore};

/// Open the store selected by the storage configuration.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn ContextStore>, StorageError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryContextStore::new())),
        "file" => Ok(Arc::new(FileContextStore::new(config.resolved_path()).await?)),
        other => Err(StorageError::Unavailable(format!("unknown backend '{}'", other))),
    }
}

//! Key-addressed content store used to persist repository configuration
//! documents.
//!
//! Backends implement [`Storage`]; [`get_storage`] builds the backend selected
//! in the service config.

pub mod config;
pub mod filesystem;
pub mod key;
pub mod locks;
pub mod memory;

use async_trait::async_trait;
use std::io;
use std::sync::Arc;

pub use config::StorageConfig;
pub use filesystem::FilesystemStorage;
pub use key::Key;
pub use locks::{KeyGuard, KeyLocks};
pub use memory::MemoryStorage;

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("key not found: {0}")]
    NotFound(Key),

    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },
}

/// Asynchronous key-value content store.
///
/// No versioning and no compare-and-swap: a write fully replaces whatever was
/// stored under the key before.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn exists(&self, key: &Key) -> Result<bool, StorageError>;

    /// Fails with [`StorageError::NotFound`] when nothing is stored under `key`.
    async fn read(&self, key: &Key) -> Result<Vec<u8>, StorageError>;

    async fn write(&self, key: &Key, content: Vec<u8>) -> Result<(), StorageError>;

    /// Lists every key below `prefix` (the whole store when `None`), sorted.
    async fn list(&self, prefix: Option<&Key>) -> Result<Vec<Key>, StorageError>;
}

pub async fn get_storage(config: &StorageConfig) -> Result<Arc<dyn Storage>, StorageError> {
    let storage: Arc<dyn Storage> = match config {
        StorageConfig::Filesystem { path } => {
            tracing::info!(path = %path, "Using filesystem storage");
            Arc::new(FilesystemStorage::open(path).await?)
        }
        StorageConfig::Memory => {
            tracing::warn!("Using in-memory storage, documents are lost on restart");
            Arc::new(MemoryStorage::new())
        }
    };
    Ok(storage)
}

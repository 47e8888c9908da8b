use crate::{Key, Storage, StorageError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<BTreeMap<Key, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn exists(&self, key: &Key) -> Result<bool, StorageError> {
        Ok(self.data.read().await.contains_key(key))
    }

    async fn read(&self, key: &Key) -> Result<Vec<u8>, StorageError> {
        self.data
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.clone()))
    }

    async fn write(&self, key: &Key, content: Vec<u8>) -> Result<(), StorageError> {
        self.data.write().await.insert(key.clone(), content);
        Ok(())
    }

    async fn list(&self, prefix: Option<&Key>) -> Result<Vec<Key>, StorageError> {
        let data = self.data.read().await;
        Ok(data
            .keys()
            .filter(|key| prefix.is_none_or(|prefix| key.starts_with(prefix)))
            .cloned()
            .collect())
    }
}

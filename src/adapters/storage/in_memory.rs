//! In-memory object storage for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::ports::{ObjectStorage, StorageError};

/// In-memory object storage.
#[derive(Default, Clone)]
pub struct InMemoryObjectStorage {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemoryObjectStorage {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects (test assertion helper).
    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    /// True when nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .lock()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        self.objects.lock().await.insert(path.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.objects.lock().await.remove(path);
        Ok(())
    }
}

//! ObjectStorage port - raw bytes for uploaded materials.

use async_trait::async_trait;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Port for the object storage service.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Fetches the raw bytes at a storage path.
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Stores bytes at a path, overwriting any existing object.
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    /// Deletes the object at a path. Deleting a missing object is a no-op.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

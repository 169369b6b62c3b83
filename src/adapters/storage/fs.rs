//! Filesystem-backed object storage.
//!
//! Objects live under one root directory; storage paths map to relative file
//! paths. Path traversal components are rejected before touching the disk.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use crate::ports::{ObjectStorage, StorageError};

/// Object storage rooted at a local directory.
pub struct FsObjectStorage {
    root: PathBuf,
}

impl FsObjectStorage {
    /// Creates storage rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || relative.as_os_str().is_empty() {
            return Err(StorageError::Unavailable(format!(
                "invalid storage path: {}",
                path
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for FsObjectStorage {
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(StorageError::Unavailable(e.to_string())),
        }
    }

    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        }
        tokio::fs::write(&full, bytes)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Unavailable(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsObjectStorage::new(dir.path());

        storage
            .put("uploads/notes.txt", b"hello".to_vec())
            .await
            .unwrap();
        let bytes = storage.get("uploads/notes.txt").await.unwrap();
        assert_eq!(bytes, b"hello");

        storage.delete("uploads/notes.txt").await.unwrap();
        let err = storage.get("uploads/notes.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));

        // Deleting again is a no-op.
        storage.delete("uploads/notes.txt").await.unwrap();
    }

    #[tokio::test]
    async fn traversal_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsObjectStorage::new(dir.path());
        assert!(storage.get("../etc/passwd").await.is_err());
        assert!(storage.put("/abs/path", vec![]).await.is_err());
    }
}

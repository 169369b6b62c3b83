//! In-memory search index for testing.
//!
//! Writes settle immediately; every task handle resolves as succeeded. The
//! document map is exposed so tests can assert what got indexed.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::ports::{SearchDocument, SearchIndex, SearchIndexError, TaskHandle, TaskStatus};

/// In-memory search index.
#[derive(Default, Clone)]
pub struct InMemorySearchIndex {
    indexes: Arc<Mutex<HashMap<String, HashMap<String, SearchDocument>>>>,
    next_task: Arc<Mutex<u64>>,
}

impl InMemorySearchIndex {
    /// Creates an empty index set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents currently in an index (test assertion helper).
    pub async fn documents(&self, index: &str) -> Vec<SearchDocument> {
        let indexes = self.indexes.lock().await;
        indexes
            .get(index)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    async fn mint_task(&self) -> TaskHandle {
        let mut next = self.next_task.lock().await;
        *next += 1;
        TaskHandle(*next)
    }
}

#[async_trait]
impl SearchIndex for InMemorySearchIndex {
    async fn add_documents(
        &self,
        index: &str,
        documents: Vec<SearchDocument>,
        _primary_key: &str,
    ) -> Result<TaskHandle, SearchIndexError> {
        let mut indexes = self.indexes.lock().await;
        let entry = indexes.entry(index.to_string()).or_default();
        for doc in documents {
            entry.insert(doc.id.clone(), doc);
        }
        drop(indexes);
        Ok(self.mint_task().await)
    }

    async fn wait_for_task(
        &self,
        _task: TaskHandle,
        _timeout: Duration,
        _poll_interval: Duration,
    ) -> Result<TaskStatus, SearchIndexError> {
        Ok(TaskStatus::Succeeded)
    }

    async fn delete_documents(
        &self,
        index: &str,
        ids: Vec<String>,
    ) -> Result<TaskHandle, SearchIndexError> {
        let mut indexes = self.indexes.lock().await;
        if let Some(docs) = indexes.get_mut(index) {
            for id in &ids {
                docs.remove(id);
            }
        }
        drop(indexes);
        Ok(self.mint_task().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn add_then_delete_documents() {
        let index = InMemorySearchIndex::new();
        let task = index
            .add_documents(
                "quiz_items",
                vec![
                    SearchDocument {
                        id: "i1".into(),
                        fields: json!({"question": "Q1"}),
                    },
                    SearchDocument {
                        id: "i2".into(),
                        fields: json!({"question": "Q2"}),
                    },
                ],
                "id",
            )
            .await
            .unwrap();
        let status = index
            .wait_for_task(task, Duration::from_secs(1), Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(status, TaskStatus::Succeeded);
        assert_eq!(index.documents("quiz_items").await.len(), 2);

        index
            .delete_documents("quiz_items", vec!["i1".into()])
            .await
            .unwrap();
        let remaining = index.documents("quiz_items").await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "i2");
    }
}

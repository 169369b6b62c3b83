//! SearchIndex port - interface to the external search service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// One document to index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    /// Primary key value.
    pub id: String,
    /// Indexed fields.
    pub fields: Value,
}

/// Handle for an asynchronous index task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle(pub u64);

/// Terminal status of an index task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Succeeded,
    Failed,
}

/// Search index errors.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    #[error("search index unavailable: {0}")]
    Unavailable(String),

    #[error("index task {0} failed")]
    TaskFailed(u64),

    #[error("timed out waiting for index task {0}")]
    TaskTimeout(u64),
}

/// Port for the search index service.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Submits documents for indexing; returns the async task handle.
    async fn add_documents(
        &self,
        index: &str,
        documents: Vec<SearchDocument>,
        primary_key: &str,
    ) -> Result<TaskHandle, SearchIndexError>;

    /// Polls the task until it settles or `timeout` elapses.
    async fn wait_for_task(
        &self,
        task: TaskHandle,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<TaskStatus, SearchIndexError>;

    /// Removes documents by primary key.
    async fn delete_documents(
        &self,
        index: &str,
        ids: Vec<String>,
    ) -> Result<TaskHandle, SearchIndexError>;
}

//! HTTP client for the search service.
//!
//! The service accepts documents asynchronously: writes return a task id and
//! the task settles later. `wait_for_task` polls the task endpoint until it
//! reaches a terminal state or the deadline passes.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tokio::time::{sleep, Instant};

use crate::ports::{SearchDocument, SearchIndex, SearchIndexError, TaskHandle, TaskStatus};

/// Connection settings for the search service.
#[derive(Debug, Clone)]
pub struct SearchIndexConfig {
    /// Base URL, e.g. `http://127.0.0.1:7700`.
    pub base_url: String,
    /// API key sent as a bearer credential.
    pub api_key: SecretString,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Search index client.
pub struct HttpSearchIndex {
    client: reqwest::Client,
    config: SearchIndexConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskAccepted {
    task_uid: u64,
}

#[derive(Debug, Deserialize)]
struct TaskBody {
    status: String,
}

impl HttpSearchIndex {
    /// Builds a client from connection settings.
    pub fn new(config: SearchIndexConfig) -> Result<Self, SearchIndexError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SearchIndexError::Unavailable(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn submit(&self, request: reqwest::RequestBuilder) -> Result<TaskHandle, SearchIndexError> {
        let response = request
            .bearer_auth(self.config.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| SearchIndexError::Unavailable(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchIndexError::Unavailable(format!("{}: {}", status, body)));
        }
        let accepted: TaskAccepted = response
            .json()
            .await
            .map_err(|e| SearchIndexError::Unavailable(e.to_string()))?;
        Ok(TaskHandle(accepted.task_uid))
    }
}

#[async_trait]
impl SearchIndex for HttpSearchIndex {
    async fn add_documents(
        &self,
        index: &str,
        documents: Vec<SearchDocument>,
        primary_key: &str,
    ) -> Result<TaskHandle, SearchIndexError> {
        let body: Vec<serde_json::Value> = documents
            .into_iter()
            .map(|doc| {
                let mut fields = doc.fields;
                if let Some(map) = fields.as_object_mut() {
                    map.insert(primary_key.to_string(), json!(doc.id));
                }
                fields
            })
            .collect();
        self.submit(
            self.client
                .post(self.url(&format!("/indexes/{}/documents", index)))
                .query(&[("primaryKey", primary_key)])
                .json(&body),
        )
        .await
    }

    async fn wait_for_task(
        &self,
        task: TaskHandle,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<TaskStatus, SearchIndexError> {
        let deadline = Instant::now() + timeout;
        loop {
            let response = self
                .client
                .get(self.url(&format!("/tasks/{}", task.0)))
                .bearer_auth(self.config.api_key.expose_secret())
                .send()
                .await
                .map_err(|e| SearchIndexError::Unavailable(e.to_string()))?;
            let body: TaskBody = response
                .json()
                .await
                .map_err(|e| SearchIndexError::Unavailable(e.to_string()))?;
            match body.status.as_str() {
                "succeeded" => return Ok(TaskStatus::Succeeded),
                "failed" | "canceled" => return Err(SearchIndexError::TaskFailed(task.0)),
                _ => {}
            }
            if Instant::now() + poll_interval > deadline {
                return Err(SearchIndexError::TaskTimeout(task.0));
            }
            sleep(poll_interval).await;
        }
    }

    async fn delete_documents(
        &self,
        index: &str,
        ids: Vec<String>,
    ) -> Result<TaskHandle, SearchIndexError> {
        self.submit(
            self.client
                .post(self.url(&format!("/indexes/{}/documents/delete-batch", index)))
                .json(&ids),
        )
        .await
    }
}

//! HTTP client for the document record store.
//!
//! Talks to the store's REST API. Increment patches are rendered with the
//! store's `field+` operator so the addition happens server-side in one
//! request, with no read-modify-write window.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::ports::{Filter, Patch, Record, RecordStore, RecordStoreError, SortOrder};

/// Connection settings for the record store API.
#[derive(Debug, Clone)]
pub struct RecordStoreConfig {
    /// Base URL, e.g. `http://127.0.0.1:8090`.
    pub base_url: String,
    /// Service token sent as a bearer credential.
    pub service_token: SecretString,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Record store client backed by the store's REST API.
pub struct HttpRecordStore {
    client: reqwest::Client,
    config: RecordStoreConfig,
}

#[derive(Debug, Deserialize)]
struct RecordBody {
    id: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ListBody {
    items: Vec<RecordBody>,
}

impl From<RecordBody> for Record {
    fn from(body: RecordBody) -> Self {
        Record {
            id: body.id,
            fields: body.fields,
        }
    }
}

impl HttpRecordStore {
    /// Builds a client from connection settings.
    pub fn new(config: RecordStoreConfig) -> Result<Self, RecordStoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RecordStoreError::Unavailable(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn records_url(&self, collection: &str) -> String {
        format!(
            "{}/api/collections/{}/records",
            self.config.base_url.trim_end_matches('/'),
            collection
        )
    }

    fn record_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}", self.records_url(collection), id)
    }

    /// Renders patches as an update body, using the `field+` operator for
    /// increments.
    fn patch_body(patches: &[Patch]) -> Map<String, Value> {
        let mut body = Map::new();
        for patch in patches {
            match patch {
                Patch::Set(field, value) => {
                    body.insert(field.clone(), value.clone());
                }
                Patch::Increment(field, by) => {
                    body.insert(format!("{}+", field), Value::from(*by));
                }
            }
        }
        body
    }

    async fn check_status(
        response: reqwest::Response,
        collection: &str,
        id: &str,
    ) -> Result<reqwest::Response, RecordStoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let detail = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(RecordStoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            }),
            s if s.is_client_error() => Err(RecordStoreError::Rejected(format!(
                "{} {}: {}",
                s, collection, detail
            ))),
            s => Err(RecordStoreError::Unavailable(format!(
                "{} {}: {}",
                s, collection, detail
            ))),
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        collection: &str,
        id: &str,
    ) -> Result<reqwest::Response, RecordStoreError> {
        let response = request
            .bearer_auth(self.config.service_token.expose_secret())
            .send()
            .await
            .map_err(|e| RecordStoreError::Unavailable(e.to_string()))?;
        Self::check_status(response, collection, id).await
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Record, RecordStoreError> {
        let response = self
            .send(self.client.get(self.record_url(collection, id)), collection, id)
            .await?;
        let body: RecordBody = response
            .json()
            .await
            .map_err(|e| RecordStoreError::Deserialize(e.to_string()))?;
        Ok(body.into())
    }

    async fn get_first(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Record>, RecordStoreError> {
        let mut records = self
            .get_full_list(collection, filter, SortOrder::CreatedAsc, 1)
            .await?;
        Ok(records.pop())
    }

    async fn create(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<Record, RecordStoreError> {
        let response = self
            .send(
                self.client.post(self.records_url(collection)).json(&fields),
                collection,
                "",
            )
            .await?;
        let body: RecordBody = response
            .json()
            .await
            .map_err(|e| RecordStoreError::Deserialize(e.to_string()))?;
        Ok(body.into())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patches: Vec<Patch>,
    ) -> Result<Record, RecordStoreError> {
        let body = Self::patch_body(&patches);
        let response = self
            .send(
                self.client.patch(self.record_url(collection, id)).json(&body),
                collection,
                id,
            )
            .await?;
        let body: RecordBody = response
            .json()
            .await
            .map_err(|e| RecordStoreError::Deserialize(e.to_string()))?;
        Ok(body.into())
    }

    async fn get_full_list(
        &self,
        collection: &str,
        filter: &Filter,
        sort: SortOrder,
        limit: usize,
    ) -> Result<Vec<Record>, RecordStoreError> {
        let sort_param = match sort {
            SortOrder::CreatedAsc => "created",
            SortOrder::CreatedDesc => "-created",
        };
        let mut request = self
            .client
            .get(self.records_url(collection))
            .query(&[("sort", sort_param), ("perPage", &limit.to_string())]);
        if !filter.clauses.is_empty() {
            request = request.query(&[("filter", filter.to_query())]);
        }
        let response = self.send(request, collection, "").await?;
        let body: ListBody = response
            .json()
            .await
            .map_err(|e| RecordStoreError::Deserialize(e.to_string()))?;
        Ok(body.items.into_iter().map(Record::from).collect())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), RecordStoreError> {
        self.send(self.client.delete(self.record_url(collection, id)), collection, id)
            .await?;
        Ok(())
    }
}

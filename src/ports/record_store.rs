//! RecordStore port - interface to the document record store.
//!
//! The store holds all persisted entities as schemaless JSON records grouped
//! into named collections. Patches support an atomic increment operator
//! (`field+` semantics) so usage counters never go through a read-modify-write
//! cycle.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// One persisted record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Store-minted identifier.
    pub id: String,
    /// Record fields as stored.
    pub fields: Map<String, Value>,
}

impl Record {
    /// Deserializes the record fields into a typed entity.
    ///
    /// The record id is injected under `"id"` so entities with an id field
    /// deserialize without the store duplicating it in `fields`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, RecordStoreError> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| RecordStoreError::Deserialize(e.to_string()))
    }

    /// Serializes an entity into store fields, dropping its `"id"`.
    pub fn fields_from<T: Serialize>(entity: &T) -> Result<Map<String, Value>, RecordStoreError> {
        let value =
            serde_json::to_value(entity).map_err(|e| RecordStoreError::Deserialize(e.to_string()))?;
        match value {
            Value::Object(mut map) => {
                map.remove("id");
                Ok(map)
            }
            _ => Err(RecordStoreError::Deserialize(
                "entity did not serialize to an object".to_string(),
            )),
        }
    }
}

/// Equality filter over record fields.
///
/// Kept structural (not a raw query string) so both the HTTP client and the
/// in-memory double interpret it identically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub clauses: Vec<(String, Value)>,
}

impl Filter {
    /// Starts a filter with one equality clause.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            clauses: vec![(field.into(), value.into())],
        }
    }

    /// Adds another equality clause (AND semantics).
    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    /// Renders the filter in the store's query syntax.
    pub fn to_query(&self) -> String {
        self.clauses
            .iter()
            .map(|(field, value)| match value {
                Value::String(s) => format!("{}='{}'", field, s.replace('\'', "\\'")),
                other => format!("{}={}", field, other),
            })
            .collect::<Vec<_>>()
            .join(" && ")
    }

    /// True when a field map satisfies every clause.
    pub fn matches(&self, fields: &Map<String, Value>) -> bool {
        self.clauses
            .iter()
            .all(|(field, value)| fields.get(field) == Some(value))
    }
}

/// Sort order for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    CreatedAsc,
    CreatedDesc,
}

/// One field mutation within an update.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// Overwrite the field.
    Set(String, Value),
    /// Atomically add to a numeric field (`field+` operator).
    Increment(String, i64),
}

impl Patch {
    /// Convenience constructor for a set patch.
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Patch::Set(field.into(), value.into())
    }

    /// Convenience constructor for an increment patch.
    pub fn increment(field: impl Into<String>, by: i64) -> Self {
        Patch::Increment(field.into(), by)
    }
}

/// Record store errors.
#[derive(Debug, Clone, Error)]
pub enum RecordStoreError {
    #[error("record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("record rejected: {0}")]
    Rejected(String),

    #[error("failed to deserialize record: {0}")]
    Deserialize(String),
}

/// Port for the document record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetches one record by id.
    async fn get(&self, collection: &str, id: &str) -> Result<Record, RecordStoreError>;

    /// Fetches the first record matching the filter, if any.
    async fn get_first(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Record>, RecordStoreError>;

    /// Creates a record; the store mints the id.
    async fn create(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<Record, RecordStoreError>;

    /// Applies patches to a record and returns the updated state.
    ///
    /// Increment patches are atomic at the store: concurrent increments
    /// never lose updates.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patches: Vec<Patch>,
    ) -> Result<Record, RecordStoreError>;

    /// Lists records matching the filter.
    async fn get_full_list(
        &self,
        collection: &str,
        filter: &Filter,
        sort: SortOrder,
        limit: usize,
    ) -> Result<Vec<Record>, RecordStoreError>;

    /// Deletes a record. Deleting a missing record is an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), RecordStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_renders_store_query_syntax() {
        let filter = Filter::eq("user_id", "u-1").and_eq("status", "final");
        assert_eq!(filter.to_query(), "user_id='u-1' && status='final'");
    }

    #[test]
    fn filter_escapes_single_quotes() {
        let filter = Filter::eq("title", "it's");
        assert_eq!(filter.to_query(), "title='it\\'s'");
    }

    #[test]
    fn filter_matches_requires_all_clauses() {
        let filter = Filter::eq("a", 1).and_eq("b", "x");
        let mut fields = Map::new();
        fields.insert("a".into(), json!(1));
        fields.insert("b".into(), json!("x"));
        assert!(filter.matches(&fields));

        fields.insert("b".into(), json!("y"));
        assert!(!filter.matches(&fields));
    }

    #[test]
    fn record_deserialize_injects_id() {
        #[derive(serde::Deserialize)]
        struct Entity {
            id: String,
            name: String,
        }
        let mut fields = Map::new();
        fields.insert("name".into(), json!("quiz one"));
        let record = Record {
            id: "rec-1".into(),
            fields,
        };
        let entity: Entity = record.deserialize().unwrap();
        assert_eq!(entity.id, "rec-1");
        assert_eq!(entity.name, "quiz one");
    }

    #[test]
    fn fields_from_strips_id() {
        #[derive(serde::Serialize)]
        struct Entity {
            id: String,
            name: String,
        }
        let fields = Record::fields_from(&Entity {
            id: "rec-1".into(),
            name: "n".into(),
        })
        .unwrap();
        assert!(!fields.contains_key("id"));
        assert_eq!(fields.get("name"), Some(&json!("n")));
    }
}

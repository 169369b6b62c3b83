//! In-memory record store for testing and development.
//!
//! Holds collections in a map behind one async mutex. Increment patches are
//! applied inside the critical section, giving the same lost-update-free
//! behavior the production store's atomic `field+` operator provides.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::{Map, Number, Value};

use crate::ports::{Filter, Patch, Record, RecordStore, RecordStoreError, SortOrder};

#[derive(Debug, Clone)]
struct StoredRecord {
    fields: Map<String, Value>,
    seq: u64,
}

/// In-memory record store for tests and single-process development.
#[derive(Default)]
pub struct InMemoryRecordStore {
    collections: Arc<Mutex<HashMap<String, HashMap<String, StoredRecord>>>>,
    next_seq: AtomicU64,
}

impl InMemoryRecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record with a caller-chosen id (test setup helper).
    pub async fn seed(&self, collection: &str, id: &str, fields: Map<String, Value>) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let mut collections = self.collections.lock().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), StoredRecord { fields, seq });
    }

    /// Number of records in a collection (test assertion helper).
    pub async fn count(&self, collection: &str) -> usize {
        let collections = self.collections.lock().await;
        collections.get(collection).map(|c| c.len()).unwrap_or(0)
    }
}

fn apply_patch(fields: &mut Map<String, Value>, patch: &Patch) -> Result<(), RecordStoreError> {
    match patch {
        Patch::Set(field, value) => {
            fields.insert(field.clone(), value.clone());
            Ok(())
        }
        Patch::Increment(field, by) => {
            let current = fields
                .get(field)
                .and_then(Value::as_i64)
                .unwrap_or_default();
            let updated = current.checked_add(*by).ok_or_else(|| {
                RecordStoreError::Rejected(format!("counter overflow on '{}'", field))
            })?;
            fields.insert(field.clone(), Value::Number(Number::from(updated)));
            Ok(())
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Record, RecordStoreError> {
        let collections = self.collections.lock().await;
        collections
            .get(collection)
            .and_then(|c| c.get(id))
            .map(|stored| Record {
                id: id.to_string(),
                fields: stored.fields.clone(),
            })
            .ok_or_else(|| RecordStoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })
    }

    async fn get_first(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Record>, RecordStoreError> {
        let collections = self.collections.lock().await;
        let Some(records) = collections.get(collection) else {
            return Ok(None);
        };
        let mut matching: Vec<(&String, &StoredRecord)> = records
            .iter()
            .filter(|(_, stored)| filter.matches(&stored.fields))
            .collect();
        matching.sort_by_key(|(_, stored)| stored.seq);
        Ok(matching.first().map(|(id, stored)| Record {
            id: (*id).clone(),
            fields: stored.fields.clone(),
        }))
    }

    async fn create(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<Record, RecordStoreError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let id = format!("rec_{}", uuid::Uuid::new_v4().simple());
        let mut collections = self.collections.lock().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), StoredRecord { fields: fields.clone(), seq });
        Ok(Record { id, fields })
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patches: Vec<Patch>,
    ) -> Result<Record, RecordStoreError> {
        let mut collections = self.collections.lock().await;
        let stored = collections
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| RecordStoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        for patch in &patches {
            apply_patch(&mut stored.fields, patch)?;
        }
        Ok(Record {
            id: id.to_string(),
            fields: stored.fields.clone(),
        })
    }

    async fn get_full_list(
        &self,
        collection: &str,
        filter: &Filter,
        sort: SortOrder,
        limit: usize,
    ) -> Result<Vec<Record>, RecordStoreError> {
        let collections = self.collections.lock().await;
        let Some(records) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut matching: Vec<(&String, &StoredRecord)> = records
            .iter()
            .filter(|(_, stored)| filter.matches(&stored.fields))
            .collect();
        matching.sort_by_key(|(_, stored)| stored.seq);
        if sort == SortOrder::CreatedDesc {
            matching.reverse();
        }
        Ok(matching
            .into_iter()
            .take(limit)
            .map(|(id, stored)| Record {
                id: id.clone(),
                fields: stored.fields.clone(),
            })
            .collect())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), RecordStoreError> {
        let mut collections = self.collections.lock().await;
        let removed = collections
            .get_mut(collection)
            .and_then(|c| c.remove(id));
        if removed.is_none() {
            return Err(RecordStoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn create_then_get_roundtrips() {
        let store = InMemoryRecordStore::new();
        let record = store
            .create("quizzes", fields(&[("title", json!("t"))]))
            .await
            .unwrap();
        let fetched = store.get("quizzes", &record.id).await.unwrap();
        assert_eq!(fetched.fields.get("title"), Some(&json!("t")));
    }

    #[tokio::test]
    async fn get_missing_record_is_not_found() {
        let store = InMemoryRecordStore::new();
        let err = store.get("quizzes", "nope").await.unwrap_err();
        assert!(matches!(err, RecordStoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn get_first_respects_filter_and_insertion_order() {
        let store = InMemoryRecordStore::new();
        store
            .seed("subs", "s1", fields(&[("user_id", json!("u1"))]))
            .await;
        store
            .seed("subs", "s2", fields(&[("user_id", json!("u2"))]))
            .await;
        let found = store
            .get_first("subs", &Filter::eq("user_id", "u2"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "s2");

        let none = store
            .get_first("subs", &Filter::eq("user_id", "u3"))
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn increment_patch_adds_to_counter() {
        let store = InMemoryRecordStore::new();
        store
            .seed("subs", "s1", fields(&[("quiz_items_usage", json!(5))]))
            .await;
        let updated = store
            .update("subs", "s1", vec![Patch::increment("quiz_items_usage", 3)])
            .await
            .unwrap();
        assert_eq!(updated.fields.get("quiz_items_usage"), Some(&json!(8)));
    }

    #[tokio::test]
    async fn increment_on_missing_field_starts_from_zero() {
        let store = InMemoryRecordStore::new();
        store.seed("subs", "s1", Map::new()).await;
        let updated = store
            .update("subs", "s1", vec![Patch::increment("messages_usage", 2)])
            .await
            .unwrap();
        assert_eq!(updated.fields.get("messages_usage"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn concurrent_increments_lose_no_updates() {
        let store = Arc::new(InMemoryRecordStore::new());
        store
            .seed("subs", "s1", fields(&[("messages_usage", json!(0))]))
            .await;

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .update("subs", "s1", vec![Patch::increment("messages_usage", 1)])
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let record = store.get("subs", "s1").await.unwrap();
        assert_eq!(record.fields.get("messages_usage"), Some(&json!(50)));
    }

    #[tokio::test]
    async fn full_list_sorts_and_limits() {
        let store = InMemoryRecordStore::new();
        for i in 0..5 {
            store
                .seed(
                    "materials",
                    &format!("m{}", i),
                    fields(&[("quiz_id", json!("q1"))]),
                )
                .await;
        }
        let newest = store
            .get_full_list("materials", &Filter::eq("quiz_id", "q1"), SortOrder::CreatedDesc, 2)
            .await
            .unwrap();
        assert_eq!(newest.len(), 2);
        assert_eq!(newest[0].id, "m4");
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let store = InMemoryRecordStore::new();
        store.seed("quizzes", "q1", Map::new()).await;
        store.delete("quizzes", "q1").await.unwrap();
        assert!(store.get("quizzes", "q1").await.is_err());
        assert!(store.delete("quizzes", "q1").await.is_err());
    }
}

//! Quota ledger - pre-flight validation and post-success charging.
//!
//! The ledger enforces the two halves of the metering contract:
//!
//! - `validate` rejects before any expensive work starts; a rejected request
//!   is never charged.
//! - `charge` runs after the work succeeded and increments unconditionally;
//!   a successful operation is always charged, even when a concurrent charge
//!   has meanwhile pushed usage past the limit.
//!
//! The window between check and charge is deliberate: it admits brief
//! overshoot bounded by in-flight concurrency instead of serializing every
//! generation behind a lock.

use std::sync::Arc;

use serde_json::json;

use crate::domain::billing::{Principal, Subscription, UsageCounter};
use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp, UserId};
use crate::ports::{Filter, Patch, Record, RecordStore, RecordStoreError};

use super::collections;

/// Quota ledger over the subscription collection.
#[derive(Clone)]
pub struct QuotaLedger {
    store: Arc<dyn RecordStore>,
}

impl QuotaLedger {
    /// Creates a ledger over the given store.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Loads the user's subscription, creating a free one on first contact
    /// and applying the lazy period reset when a new billing period has
    /// started since the last reset.
    pub async fn subscription(&self, user_id: &UserId) -> Result<Subscription, DomainError> {
        let record = self
            .store
            .get_first(
                collections::SUBSCRIPTIONS,
                &Filter::eq("user_id", user_id.as_str()),
            )
            .await
            .map_err(store_error)?;

        let record = match record {
            Some(record) => record,
            None => self.create_free(user_id).await?,
        };

        let mut subscription: Subscription = record.deserialize().map_err(store_error)?;

        if subscription.needs_usage_reset() {
            // Stamp the period start, not now: the monotonic comparison then
            // fires exactly once per period even when validations race.
            let reset_at = subscription.current_period_start;
            let updated = self
                .store
                .update(
                    collections::SUBSCRIPTIONS,
                    &record.id,
                    vec![
                        Patch::set("quiz_items_usage", 0),
                        Patch::set("messages_usage", 0),
                        Patch::set("last_usage_reset_at", json!(reset_at)),
                    ],
                )
                .await
                .map_err(store_error)?;
            subscription = updated.deserialize().map_err(store_error)?;
        }

        Ok(subscription)
    }

    /// Pre-flight check: builds a fresh principal and verifies it can afford
    /// `cost` against `counter`. Rejection happens before any enqueue, lock,
    /// or model call.
    pub async fn validate(
        &self,
        user_id: &UserId,
        counter: UsageCounter,
        cost: u64,
    ) -> Result<Principal, DomainError> {
        let subscription = self.subscription(user_id).await?;
        let principal = Principal::from_subscription(&subscription);
        if !principal.can_afford(counter, cost) {
            return Err(DomainError::quota_exceeded(
                principal.remaining(counter),
                cost,
            ));
        }
        Ok(principal)
    }

    /// Pre-flight storage check for a pending upload.
    pub async fn validate_storage(
        &self,
        user_id: &UserId,
        bytes: u64,
    ) -> Result<Principal, DomainError> {
        let subscription = self.subscription(user_id).await?;
        let principal = Principal::from_subscription(&subscription);
        if !principal.storage_fits(bytes) {
            return Err(DomainError::new(
                ErrorCode::StorageLimitExceeded,
                "Storage limit exceeded",
            )
            .with_detail("requested_bytes", bytes.to_string())
            .with_detail("storage_usage", principal.storage_usage.to_string()));
        }
        Ok(principal)
    }

    /// Charges `amount` against `counter` via the store's atomic increment.
    ///
    /// No balance check happens here. The operation already succeeded and
    /// its cost is real; concurrent charges may overshoot the limit, and the
    /// next `validate` will reject further work.
    pub async fn charge(
        &self,
        user_id: &UserId,
        counter: UsageCounter,
        amount: u64,
    ) -> Result<(), DomainError> {
        if amount == 0 {
            return Ok(());
        }
        let record_id = self.record_id(user_id).await?;
        self.store
            .update(
                collections::SUBSCRIPTIONS,
                &record_id,
                vec![Patch::increment(counter.field_name(), amount as i64)],
            )
            .await
            .map_err(store_error)?;
        tracing::debug!(
            user_id = %user_id,
            counter = counter.field_name(),
            amount,
            "usage charged"
        );
        Ok(())
    }

    /// Adjusts storage usage; negative deltas release bytes after a delete.
    pub async fn charge_storage(&self, user_id: &UserId, delta: i64) -> Result<(), DomainError> {
        if delta == 0 {
            return Ok(());
        }
        let record_id = self.record_id(user_id).await?;
        self.store
            .update(
                collections::SUBSCRIPTIONS,
                &record_id,
                vec![Patch::increment("storage_usage", delta)],
            )
            .await
            .map_err(store_error)?;
        Ok(())
    }

    /// Overwrites named subscription fields, provisioning a free record for
    /// a first-contact user.
    pub async fn patch_subscription(
        &self,
        user_id: &UserId,
        fields: Vec<(&str, serde_json::Value)>,
    ) -> Result<(), DomainError> {
        if fields.is_empty() {
            return Ok(());
        }
        let record_id = self.record_id(user_id).await?;
        let patches = fields
            .into_iter()
            .map(|(field, value)| Patch::set(field, value))
            .collect();
        self.store
            .update(collections::SUBSCRIPTIONS, &record_id, patches)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn record_id(&self, user_id: &UserId) -> Result<String, DomainError> {
        let record = self
            .store
            .get_first(
                collections::SUBSCRIPTIONS,
                &Filter::eq("user_id", user_id.as_str()),
            )
            .await
            .map_err(store_error)?;
        match record {
            Some(record) => Ok(record.id),
            None => Ok(self.create_free(user_id).await?.id),
        }
    }

    async fn create_free(&self, user_id: &UserId) -> Result<Record, DomainError> {
        let subscription = Subscription::new_free(
            SubscriptionId::generate(),
            user_id.clone(),
            Timestamp::now(),
        );
        let fields = Record::fields_from(&subscription).map_err(store_error)?;
        let record = self
            .store
            .create(collections::SUBSCRIPTIONS, fields)
            .await
            .map_err(store_error)?;
        tracing::info!(user_id = %user_id, "created free subscription");
        Ok(record)
    }
}

fn store_error(err: RecordStoreError) -> DomainError {
    match err {
        RecordStoreError::NotFound { collection, id } => DomainError::new(
            ErrorCode::SubscriptionNotFound,
            format!("record not found: {}/{}", collection, id),
        ),
        other => DomainError::upstream(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::record_store::InMemoryRecordStore;
    use crate::domain::billing::Tariff;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    async fn seeded_ledger(quiz_items_usage: u64) -> (Arc<InMemoryRecordStore>, QuotaLedger) {
        let store = Arc::new(InMemoryRecordStore::new());
        let mut subscription = Subscription::new_free(
            SubscriptionId::new("sub-1").unwrap(),
            user(),
            Timestamp::from_unix_secs(1_000_000),
        );
        subscription.quiz_items_usage = quiz_items_usage;
        store
            .seed(
                collections::SUBSCRIPTIONS,
                "sub-1",
                Record::fields_from(&subscription).unwrap(),
            )
            .await;
        let ledger = QuotaLedger::new(store.clone());
        (store, ledger)
    }

    #[tokio::test]
    async fn validate_passes_within_limit() {
        let (_, ledger) = seeded_ledger(25).await;
        let principal = ledger
            .validate(&user(), UsageCounter::QuizItems, 5)
            .await
            .unwrap();
        assert_eq!(principal.quiz_items_remaining, 5);
    }

    #[tokio::test]
    async fn validate_rejects_over_limit() {
        let (_, ledger) = seeded_ledger(28).await;
        let err = ledger
            .validate(&user(), UsageCounter::QuizItems, 5)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::QuotaExceeded);
        assert_eq!(err.details.get("remaining"), Some(&"2".to_string()));
        assert_eq!(err.details.get("cost"), Some(&"5".to_string()));
    }

    #[tokio::test]
    async fn charge_increments_without_checking() {
        let (_, ledger) = seeded_ledger(29).await;
        // Past the limit after this, but the charge still lands.
        ledger
            .charge(&user(), UsageCounter::QuizItems, 5)
            .await
            .unwrap();
        let subscription = ledger.subscription(&user()).await.unwrap();
        assert_eq!(subscription.quiz_items_usage, 34);
    }

    #[tokio::test]
    async fn concurrent_charges_are_additive() {
        let (_, ledger) = seeded_ledger(0).await;
        let mut handles = Vec::new();
        for _ in 0..20 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.charge(&user(), UsageCounter::Messages, 1).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        let subscription = ledger.subscription(&user()).await.unwrap();
        assert_eq!(subscription.messages_usage, 20);
    }

    #[tokio::test]
    async fn first_contact_creates_free_subscription() {
        let store = Arc::new(InMemoryRecordStore::new());
        let ledger = QuotaLedger::new(store.clone());
        let subscription = ledger.subscription(&user()).await.unwrap();
        assert_eq!(subscription.tariff, Tariff::Free);
        assert_eq!(store.count(collections::SUBSCRIPTIONS).await, 1);

        // A second load reuses the record.
        ledger.subscription(&user()).await.unwrap();
        assert_eq!(store.count(collections::SUBSCRIPTIONS).await, 1);
    }

    #[tokio::test]
    async fn new_period_resets_usage_exactly_once() {
        let store = Arc::new(InMemoryRecordStore::new());
        let mut subscription = Subscription::new_free(
            SubscriptionId::new("sub-1").unwrap(),
            user(),
            Timestamp::from_unix_secs(1_000_000),
        );
        subscription.quiz_items_usage = 12;
        subscription.messages_usage = 7;
        // Billing rolled the period; the reset has not happened yet.
        let new_start = subscription.current_period_end;
        subscription.roll_period(new_start, new_start.add_days(30));
        store
            .seed(
                collections::SUBSCRIPTIONS,
                "sub-1",
                Record::fields_from(&subscription).unwrap(),
            )
            .await;

        let ledger = QuotaLedger::new(store);
        let loaded = ledger.subscription(&user()).await.unwrap();
        assert_eq!(loaded.quiz_items_usage, 0);
        assert_eq!(loaded.messages_usage, 0);
        assert_eq!(loaded.last_usage_reset_at, new_start);
        assert!(!loaded.needs_usage_reset());
    }

    #[tokio::test]
    async fn storage_validation_enforces_byte_limit() {
        let (_, ledger) = seeded_ledger(0).await;
        // Free tier: 10 MiB.
        ledger
            .validate_storage(&user(), 10 * 1024 * 1024)
            .await
            .unwrap();
        let err = ledger
            .validate_storage(&user(), 10 * 1024 * 1024 + 1)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::StorageLimitExceeded);
    }

    #[tokio::test]
    async fn storage_charge_and_release_balance() {
        let (_, ledger) = seeded_ledger(0).await;
        ledger.charge_storage(&user(), 2048).await.unwrap();
        let subscription = ledger.subscription(&user()).await.unwrap();
        assert_eq!(subscription.storage_usage, 2048);

        ledger.charge_storage(&user(), -2048).await.unwrap();
        let subscription = ledger.subscription(&user()).await.unwrap();
        assert_eq!(subscription.storage_usage, 0);
    }
}

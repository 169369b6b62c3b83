//! In-memory entity lock for testing and single-process development.
//!
//! Mirrors the Redis adapter's semantics: acquisition fails while a
//! non-expired holder exists, expired entries are reclaimable, and release
//! only succeeds for the token that still owns the key.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::ports::{EntityLock, LockError, LockToken};

#[derive(Debug, Clone)]
struct Holder {
    token: String,
    expires_at: Instant,
}

/// In-memory entity lock.
#[derive(Default, Clone)]
pub struct InMemoryEntityLock {
    holders: Arc<Mutex<HashMap<String, Holder>>>,
}

impl InMemoryEntityLock {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the key is currently held (test assertion helper).
    pub async fn is_held(&self, key: &str) -> bool {
        let holders = self.holders.lock().await;
        holders
            .get(key)
            .map(|h| h.expires_at > Instant::now())
            .unwrap_or(false)
    }
}

#[async_trait]
impl EntityLock for InMemoryEntityLock {
    async fn try_acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<LockToken>, LockError> {
        let mut holders = self.holders.lock().await;
        let now = Instant::now();
        if let Some(holder) = holders.get(key) {
            if holder.expires_at > now {
                return Ok(None);
            }
        }
        let token = LockToken::generate();
        holders.insert(
            key.to_string(),
            Holder {
                token: token.as_str().to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(Some(token))
    }

    async fn release(&self, key: &str, token: &LockToken) -> Result<bool, LockError> {
        let mut holders = self.holders.lock().await;
        match holders.get(key) {
            Some(holder) if holder.token == token.as_str() => {
                holders.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_fails_while_held() {
        let lock = InMemoryEntityLock::new();
        let token = lock
            .try_acquire("quiz-1", Duration::from_secs(30))
            .await
            .unwrap();
        assert!(token.is_some());

        let second = lock
            .try_acquire("quiz-1", Duration::from_secs(30))
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn release_frees_the_key() {
        let lock = InMemoryEntityLock::new();
        let token = lock
            .try_acquire("quiz-1", Duration::from_secs(30))
            .await
            .unwrap()
            .unwrap();
        assert!(lock.release("quiz-1", &token).await.unwrap());
        assert!(!lock.is_held("quiz-1").await);

        let reacquired = lock
            .try_acquire("quiz-1", Duration::from_secs(30))
            .await
            .unwrap();
        assert!(reacquired.is_some());
    }

    #[tokio::test]
    async fn release_with_foreign_token_is_a_no_op() {
        let lock = InMemoryEntityLock::new();
        lock.try_acquire("quiz-1", Duration::from_secs(30))
            .await
            .unwrap()
            .unwrap();

        let foreign = LockToken::generate();
        assert!(!lock.release("quiz-1", &foreign).await.unwrap());
        assert!(lock.is_held("quiz-1").await);
    }

    #[tokio::test]
    async fn expired_lock_is_reclaimable() {
        let lock = InMemoryEntityLock::new();
        let stale = lock
            .try_acquire("quiz-1", Duration::from_millis(0))
            .await
            .unwrap()
            .unwrap();

        let fresh = lock
            .try_acquire("quiz-1", Duration::from_secs(30))
            .await
            .unwrap();
        assert!(fresh.is_some());

        // The stale holder's token no longer owns the key.
        assert!(!lock.release("quiz-1", &stale).await.unwrap());
        assert!(lock.is_held("quiz-1").await);
    }

    #[tokio::test]
    async fn independent_keys_do_not_contend() {
        let lock = InMemoryEntityLock::new();
        let a = lock
            .try_acquire("quiz-1", Duration::from_secs(30))
            .await
            .unwrap();
        let b = lock
            .try_acquire("quiz-2", Duration::from_secs(30))
            .await
            .unwrap();
        assert!(a.is_some());
        assert!(b.is_some());
    }
}

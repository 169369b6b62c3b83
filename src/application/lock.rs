//! Lock manager - bounded-wait acquisition over the entity lock port.
//!
//! Wraps an operation in acquire/run/release. Acquisition polls at a fixed
//! interval up to a wait budget; exhausting the budget surfaces as a lock
//! timeout, which the HTTP boundary renders as a conflict. Release runs on
//! every exit path; a failed release is only logged, since the TTL reclaims
//! the key anyway.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{EntityLock, LockToken};

/// Acquisition tuning.
#[derive(Debug, Clone)]
pub struct LockSettings {
    /// Lock expiry; held work must bound itself under this.
    pub ttl: Duration,
    /// Total budget for waiting on a contended key.
    pub wait_timeout: Duration,
    /// Delay between acquisition attempts.
    pub poll_interval: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(120),
            wait_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Serializes conflicting operations on one entity.
#[derive(Clone)]
pub struct LockManager {
    lock: Arc<dyn EntityLock>,
    settings: LockSettings,
}

impl LockManager {
    /// Creates a manager over the given lock backend.
    pub fn new(lock: Arc<dyn EntityLock>, settings: LockSettings) -> Self {
        Self { lock, settings }
    }

    /// Acquires `key`, runs `op`, and releases on every exit path.
    ///
    /// Returns `LockTimeout` when the key stays contended past the wait
    /// budget.
    pub async fn with_lock<T, F, Fut>(&self, key: &str, op: F) -> Result<T, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let token = self.acquire(key).await?;
        let result = op().await;
        self.release(key, &token).await;
        result
    }

    async fn acquire(&self, key: &str) -> Result<LockToken, DomainError> {
        let deadline = Instant::now() + self.settings.wait_timeout;
        loop {
            let attempt = self
                .lock
                .try_acquire(key, self.settings.ttl)
                .await
                .map_err(|e| DomainError::upstream(e.to_string()))?;
            if let Some(token) = attempt {
                return Ok(token);
            }
            if Instant::now() + self.settings.poll_interval > deadline {
                return Err(DomainError::new(
                    ErrorCode::LockTimeout,
                    format!("entity '{}' is busy", key),
                ));
            }
            sleep(self.settings.poll_interval).await;
        }
    }

    async fn release(&self, key: &str, token: &LockToken) {
        match self.lock.release(key, token).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(key, "lock expired before release; held work exceeded ttl");
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "lock release failed; ttl will reclaim");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::lock::InMemoryEntityLock;

    fn manager(lock: Arc<InMemoryEntityLock>, wait_ms: u64) -> LockManager {
        LockManager::new(
            lock,
            LockSettings {
                ttl: Duration::from_secs(5),
                wait_timeout: Duration::from_millis(wait_ms),
                poll_interval: Duration::from_millis(10),
            },
        )
    }

    #[tokio::test]
    async fn runs_op_and_releases() {
        let lock = Arc::new(InMemoryEntityLock::new());
        let manager = manager(lock.clone(), 100);
        let result = manager
            .with_lock("quiz-1", || async { Ok::<_, DomainError>(42) })
            .await
            .unwrap();
        assert_eq!(result, 42);
        assert!(!lock.is_held("quiz-1").await);
    }

    #[tokio::test]
    async fn releases_even_when_op_fails() {
        let lock = Arc::new(InMemoryEntityLock::new());
        let manager = manager(lock.clone(), 100);
        let err = manager
            .with_lock("quiz-1", || async {
                Err::<(), _>(DomainError::upstream("boom"))
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UpstreamUnavailable);
        assert!(!lock.is_held("quiz-1").await);
    }

    #[tokio::test]
    async fn contended_key_times_out() {
        let lock = Arc::new(InMemoryEntityLock::new());
        // Hold the key outside the manager.
        lock.try_acquire("quiz-1", Duration::from_secs(60))
            .await
            .unwrap()
            .unwrap();

        let manager = manager(lock, 50);
        let err = manager
            .with_lock("quiz-1", || async { Ok::<_, DomainError>(()) })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::LockTimeout);
    }

    #[tokio::test]
    async fn waiter_gets_the_lock_once_freed() {
        let lock = Arc::new(InMemoryEntityLock::new());
        let holder = lock
            .try_acquire("quiz-1", Duration::from_secs(60))
            .await
            .unwrap()
            .unwrap();

        let manager = manager(lock.clone(), 500);
        let release_lock = lock.clone();
        let releaser = tokio::spawn(async move {
            sleep(Duration::from_millis(30)).await;
            release_lock.release("quiz-1", &holder).await.unwrap();
        });

        let result = manager
            .with_lock("quiz-1", || async { Ok::<_, DomainError>("ran") })
            .await
            .unwrap();
        assert_eq!(result, "ran");
        releaser.await.unwrap();
    }
}

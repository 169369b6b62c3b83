//! Background worker and lock configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Background worker configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    /// Number of worker tasks draining the queue
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Entity lock expiry in seconds
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_secs: u64,

    /// Total budget for waiting on a contended lock, in seconds
    #[serde(default = "default_lock_wait")]
    pub lock_wait_timeout_secs: u64,

    /// Delay between lock acquisition attempts, in milliseconds
    #[serde(default = "default_lock_poll")]
    pub lock_poll_interval_ms: u64,
}

impl JobsConfig {
    /// Get the lock TTL as Duration
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    /// Get the lock wait budget as Duration
    pub fn lock_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_wait_timeout_secs)
    }

    /// Get the lock poll interval as Duration
    pub fn lock_poll_interval(&self) -> Duration {
        Duration::from_millis(self.lock_poll_interval_ms)
    }

    /// Validate worker configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.worker_count == 0 {
            return Err(ValidationError::InvalidWorkerCount);
        }
        if self.lock_wait_timeout() <= self.lock_poll_interval() {
            return Err(ValidationError::InvalidLockTimings);
        }
        Ok(())
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            lock_ttl_secs: default_lock_ttl(),
            lock_wait_timeout_secs: default_lock_wait(),
            lock_poll_interval_ms: default_lock_poll(),
        }
    }
}

fn default_worker_count() -> usize {
    4
}

fn default_lock_ttl() -> u64 {
    120
}

fn default_lock_wait() -> u64 {
    10
}

fn default_lock_poll() -> u64 {
    250
}

//! Redis-backed work queue for multi-server deployments.
//!
//! Jobs are JSON envelopes on a Redis list: `LPUSH` to submit, `BRPOP` to
//! consume. Exhausted jobs are pushed onto a separate failed-job list with
//! the error attached, capped so the list cannot grow without bound.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::foundation::Timestamp;
use crate::ports::{JobEnvelope, QueueError, WorkQueue};

const FAILED_LIST_CAP: isize = 1000;

#[derive(Debug, Serialize, Deserialize)]
struct FailedJob {
    job: JobEnvelope,
    error: String,
    failed_at: Timestamp,
}

/// Redis-backed work queue.
#[derive(Clone)]
pub struct RedisWorkQueue {
    conn: MultiplexedConnection,
    queue_key: String,
    failed_key: String,
}

impl RedisWorkQueue {
    /// Creates a queue over an existing Redis connection.
    pub fn new(conn: MultiplexedConnection, queue_key: impl Into<String>) -> Self {
        let queue_key = queue_key.into();
        let failed_key = format!("{}:failed", queue_key);
        Self {
            conn,
            queue_key,
            failed_key,
        }
    }
}

#[async_trait]
impl WorkQueue for RedisWorkQueue {
    async fn enqueue(&self, job: JobEnvelope) -> Result<(), QueueError> {
        let encoded =
            serde_json::to_string(&job).map_err(|e| QueueError::Malformed(e.to_string()))?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .lpush(&self.queue_key, encoded)
            .await
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<JobEnvelope>, QueueError> {
        let mut conn = self.conn.clone();
        let popped: Option<(String, String)> = conn
            .brpop(&self.queue_key, timeout.as_secs_f64())
            .await
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        match popped {
            Some((_, encoded)) => {
                let job = serde_json::from_str(&encoded)
                    .map_err(|e| QueueError::Malformed(e.to_string()))?;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    async fn mark_failed(&self, job: &JobEnvelope, error: &str) -> Result<(), QueueError> {
        let failed = FailedJob {
            job: job.clone(),
            error: error.to_string(),
            failed_at: Timestamp::now(),
        };
        let encoded =
            serde_json::to_string(&failed).map_err(|e| QueueError::Malformed(e.to_string()))?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .lpush(&self.failed_key, encoded)
            .await
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        let _: () = conn
            .ltrim(&self.failed_key, 0, FAILED_LIST_CAP - 1)
            .await
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn depth(&self) -> Result<usize, QueueError> {
        let mut conn = self.conn.clone();
        let len: usize = conn
            .llen(&self.queue_key)
            .await
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        Ok(len)
    }
}

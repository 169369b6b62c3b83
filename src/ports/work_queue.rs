//! WorkQueue port - durable at-least-once background job queue.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// One job as it travels through the queue.
///
/// `tries` counts delivery attempts; the queue re-delivers until it reaches
/// `max_tries`, after which the job lands in failed-job bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnvelope {
    /// Job handler name.
    pub job_name: String,
    /// Handler-specific payload.
    pub payload: Value,
    /// Idempotency/cost-tracking key, derived from the target entity.
    pub cache_key: String,
    /// Maximum delivery attempts.
    pub max_tries: u32,
    /// Attempts made so far.
    pub tries: u32,
}

impl JobEnvelope {
    /// Creates a fresh envelope with zero attempts.
    pub fn new(
        job_name: impl Into<String>,
        payload: Value,
        cache_key: impl Into<String>,
        max_tries: u32,
    ) -> Self {
        Self {
            job_name: job_name.into(),
            payload,
            cache_key: cache_key.into(),
            max_tries,
            tries: 0,
        }
    }

    /// True when another delivery attempt is allowed.
    pub fn can_retry(&self) -> bool {
        self.tries < self.max_tries
    }

    /// Records one delivery attempt.
    pub fn record_attempt(&mut self) {
        self.tries += 1;
    }
}

/// Queue backend errors.
#[derive(Debug, Clone, Error)]
pub enum QueueError {
    #[error("queue unavailable: {0}")]
    Unavailable(String),

    #[error("malformed job payload: {0}")]
    Malformed(String),
}

/// Port for the durable work queue.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Submits a job; fire-and-forget for the caller.
    async fn enqueue(&self, job: JobEnvelope) -> Result<(), QueueError>;

    /// Blocks up to `timeout` for the next job.
    async fn dequeue(&self, timeout: Duration) -> Result<Option<JobEnvelope>, QueueError>;

    /// Records a job that exhausted its retries.
    ///
    /// The original caller is never re-notified; visibility is through the
    /// queue's own bookkeeping.
    async fn mark_failed(&self, job: &JobEnvelope, error: &str) -> Result<(), QueueError>;

    /// Number of jobs waiting for delivery.
    async fn depth(&self) -> Result<usize, QueueError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fresh_envelope_can_retry() {
        let job = JobEnvelope::new("generate_quiz_items", json!({"quiz_id": "q1"}), "quiz-q1", 3);
        assert_eq!(job.tries, 0);
        assert!(job.can_retry());
    }

    #[test]
    fn retries_stop_at_max_tries() {
        let mut job = JobEnvelope::new("finalize_attempt", json!({}), "attempt-1", 2);
        job.record_attempt();
        assert!(job.can_retry());
        job.record_attempt();
        assert!(!job.can_retry());
    }

    #[test]
    fn envelope_roundtrips_as_json() {
        let job = JobEnvelope::new("start_quiz", json!({"quiz_id": "q1"}), "quiz-q1", 3);
        let encoded = serde_json::to_string(&job).unwrap();
        let decoded: JobEnvelope = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, job);
    }
}

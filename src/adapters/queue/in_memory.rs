//! In-memory work queue for testing and single-process development.
//!
//! FIFO over an async channel. Failed jobs are kept in a list the tests can
//! inspect.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

use crate::ports::{JobEnvelope, QueueError, WorkQueue};

/// In-memory work queue.
#[derive(Clone)]
pub struct InMemoryWorkQueue {
    sender: mpsc::UnboundedSender<JobEnvelope>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<JobEnvelope>>>,
    depth: Arc<Mutex<usize>>,
    failed: Arc<Mutex<Vec<(JobEnvelope, String)>>>,
}

impl Default for InMemoryWorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryWorkQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            depth: Arc::new(Mutex::new(0)),
            failed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Jobs that exhausted their retries (test assertion helper).
    pub async fn failed_jobs(&self) -> Vec<(JobEnvelope, String)> {
        self.failed.lock().await.clone()
    }
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn enqueue(&self, job: JobEnvelope) -> Result<(), QueueError> {
        self.sender
            .send(job)
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        *self.depth.lock().await += 1;
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<JobEnvelope>, QueueError> {
        let mut receiver = self.receiver.lock().await;
        match tokio::time::timeout(timeout, receiver.recv()).await {
            Ok(Some(job)) => {
                let mut depth = self.depth.lock().await;
                *depth = depth.saturating_sub(1);
                Ok(Some(job))
            }
            Ok(None) => Err(QueueError::Unavailable("queue closed".to_string())),
            Err(_) => Ok(None),
        }
    }

    async fn mark_failed(&self, job: &JobEnvelope, error: &str) -> Result<(), QueueError> {
        self.failed
            .lock()
            .await
            .push((job.clone(), error.to_string()));
        Ok(())
    }

    async fn depth(&self) -> Result<usize, QueueError> {
        Ok(*self.depth.lock().await)
    }
}

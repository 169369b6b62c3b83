//! Worker loop: drains the queue and routes envelopes to handlers.
//!
//! Delivery is at-least-once. A failed attempt goes back on the queue until
//! `max_tries` is exhausted, then lands in failed-job bookkeeping. Handlers
//! are written to tolerate re-delivery.

use std::sync::Arc;
use std::time::Duration;

use crate::application::context::AppContext;
use crate::ports::JobEnvelope;

use super::handlers;

const DEQUEUE_TIMEOUT: Duration = Duration::from_secs(5);
const HEARTBEAT_EVERY: u32 = 12;

/// One background worker over the shared queue.
pub struct JobWorker {
    ctx: Arc<AppContext>,
    /// Label in worker log lines.
    name: String,
}

impl JobWorker {
    pub fn new(ctx: Arc<AppContext>, name: impl Into<String>) -> Self {
        Self {
            ctx,
            name: name.into(),
        }
    }

    /// Runs until the task is aborted.
    pub async fn run(self) {
        tracing::info!(worker = %self.name, "worker started");
        let mut idle_polls = 0u32;
        loop {
            match self.poll_once(DEQUEUE_TIMEOUT).await {
                Ok(true) => idle_polls = 0,
                Ok(false) => {
                    idle_polls += 1;
                    if idle_polls % HEARTBEAT_EVERY == 0 {
                        let depth = self.ctx.queue.depth().await.unwrap_or(0);
                        tracing::debug!(worker = %self.name, depth, "worker idle");
                    }
                }
                Err(err) => {
                    tracing::error!(worker = %self.name, error = %err, "queue poll failed");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    /// Waits up to `timeout` for one job and processes it.
    ///
    /// Returns whether a job was processed.
    pub async fn poll_once(&self, timeout: Duration) -> Result<bool, crate::ports::QueueError> {
        let Some(job) = self.ctx.queue.dequeue(timeout).await? else {
            return Ok(false);
        };
        self.process(job).await;
        Ok(true)
    }

    async fn process(&self, mut job: JobEnvelope) {
        job.record_attempt();
        tracing::info!(
            worker = %self.name,
            job_name = %job.job_name,
            cache_key = %job.cache_key,
            attempt = job.tries,
            "job picked up"
        );

        match handlers::dispatch(&self.ctx, &job).await {
            Ok(()) => {
                tracing::info!(worker = %self.name, job_name = %job.job_name, cache_key = %job.cache_key, "job done");
            }
            Err(err) if job.can_retry() => {
                tracing::warn!(
                    worker = %self.name,
                    job_name = %job.job_name,
                    cache_key = %job.cache_key,
                    attempt = job.tries,
                    error = %err,
                    "job failed, re-queueing"
                );
                if let Err(queue_err) = self.ctx.queue.enqueue(job).await {
                    tracing::error!(worker = %self.name, error = %queue_err, "re-queue failed, job lost");
                }
            }
            Err(err) => {
                tracing::error!(
                    worker = %self.name,
                    job_name = %job.job_name,
                    cache_key = %job.cache_key,
                    error = %err,
                    "job exhausted retries"
                );
                if let Err(queue_err) = self
                    .ctx
                    .queue
                    .mark_failed(&job, &err.to_string())
                    .await
                {
                    tracing::error!(worker = %self.name, error = %queue_err, "failed-job bookkeeping write failed");
                }
            }
        }
    }
}

/// Spawns `count` workers onto the runtime.
pub fn spawn_pool(ctx: Arc<AppContext>, count: usize) -> Vec<tokio::task::JoinHandle<()>> {
    (0..count)
        .map(|n| {
            let worker = JobWorker::new(ctx.clone(), format!("worker-{n}"));
            tokio::spawn(worker.run())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::collections;
    use crate::application::jobs::dispatcher::QuizJobPayload;
    use crate::application::testing::test_context;
    use crate::domain::foundation::{QuizId, UserId};
    use crate::domain::quiz::{DynamicConfig, Quiz, QuizStatus};
    use crate::ports::{Record, WorkQueue};
    use serde_json::json;

    fn quiz_payload() -> QuizJobPayload {
        QuizJobPayload {
            quiz_id: QuizId::new("q1").unwrap(),
            user_id: UserId::new("u1").unwrap(),
            item_count: 2,
            dynamic: DynamicConfig::default(),
        }
    }

    #[tokio::test]
    async fn processes_a_scheduled_job_end_to_end() {
        let (ctx, fixtures) = test_context().await;
        let quiz = Quiz::new(
            QuizId::new("q1").unwrap(),
            UserId::new("u1").unwrap(),
            "Rivers",
            "world rivers",
        );
        fixtures
            .store
            .seed(
                collections::QUIZZES,
                "q1",
                Record::fields_from(&quiz).unwrap(),
            )
            .await;
        ctx.dispatcher
            .schedule_start_quiz(&quiz_payload())
            .await
            .unwrap();

        let worker = JobWorker::new(ctx.clone(), "test");
        let processed = worker.poll_once(Duration::from_millis(50)).await.unwrap();
        assert!(processed);

        let record = ctx.store.get(collections::QUIZZES, "q1").await.unwrap();
        let updated: Quiz = record.deserialize().unwrap();
        assert_eq!(updated.status, QuizStatus::Generating);
        // start_quiz chains the first generation round.
        assert_eq!(fixtures.queue.depth().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_queue_poll_returns_false() {
        let (ctx, _) = test_context().await;
        let worker = JobWorker::new(ctx, "test");
        let processed = worker.poll_once(Duration::from_millis(10)).await.unwrap();
        assert!(!processed);
    }

    #[tokio::test]
    async fn failing_job_is_requeued_with_a_recorded_attempt() {
        let (ctx, fixtures) = test_context().await;
        // No quiz record seeded: the handler fails with QuizNotFound.
        ctx.dispatcher
            .schedule_start_quiz(&quiz_payload())
            .await
            .unwrap();

        let worker = JobWorker::new(ctx, "test");
        worker.poll_once(Duration::from_millis(50)).await.unwrap();

        let requeued = fixtures
            .queue
            .dequeue(Duration::from_millis(50))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(requeued.tries, 1);
        assert!(requeued.can_retry());
    }

    #[tokio::test]
    async fn exhausted_job_lands_in_failed_bookkeeping() {
        let (ctx, fixtures) = test_context().await;
        let worker = JobWorker::new(ctx.clone(), "test");

        let mut job = crate::ports::JobEnvelope::new(
            "start_quiz",
            json!({"quiz_id": "missing", "user_id": "u1", "item_count": 1}),
            "quiz-missing",
            1,
        );
        job.tries = 0;
        ctx.queue.enqueue(job).await.unwrap();

        worker.poll_once(Duration::from_millis(50)).await.unwrap();

        assert_eq!(fixtures.queue.depth().await.unwrap(), 0);
        let failed = fixtures.queue.failed_jobs().await;
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0.job_name, "start_quiz");
    }

    #[tokio::test]
    async fn unknown_job_name_never_retries_forever() {
        let (ctx, fixtures) = test_context().await;
        let worker = JobWorker::new(ctx.clone(), "test");
        ctx.queue
            .enqueue(crate::ports::JobEnvelope::new(
                "no_such_job",
                json!({}),
                "misc",
                1,
            ))
            .await
            .unwrap();

        worker.poll_once(Duration::from_millis(50)).await.unwrap();
        assert_eq!(fixtures.queue.failed_jobs().await.len(), 1);
    }
}

//! Job dispatcher - turns accepted requests into queued envelopes.
//!
//! Dispatch is fire-and-forget for the caller: the HTTP layer answers `202`
//! `{scheduled: true}` as soon as the envelope is queued. The cache key is
//! derived from the target entity and stays stable across retries and
//! re-deliveries, so replayed jobs hit the provider's prompt cache and cost
//! tracking stays correlated.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::foundation::{AttemptId, DomainError, MaterialId, QuizId, UserId};
use crate::domain::generation::{attempt_cache_key, quiz_cache_key};
use crate::domain::quiz::DynamicConfig;
use crate::ports::{JobEnvelope, WorkQueue};

use super::names;

/// Payload for quiz generation jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizJobPayload {
    pub quiz_id: QuizId,
    pub user_id: UserId,
    pub item_count: u64,
    #[serde(default)]
    pub dynamic: DynamicConfig,
}

/// Payload for quiz finalization jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeQuizPayload {
    pub quiz_id: QuizId,
    pub user_id: UserId,
    /// Re-finalize an already-final quiz.
    #[serde(default)]
    pub force: bool,
}

/// Payload for attempt finalization jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeAttemptPayload {
    pub attempt_id: AttemptId,
    pub user_id: UserId,
}

/// Payload for material add/remove jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialJobPayload {
    pub material_id: MaterialId,
    pub user_id: UserId,
}

/// Schedules background jobs.
#[derive(Clone)]
pub struct JobDispatcher {
    queue: Arc<dyn WorkQueue>,
}

impl JobDispatcher {
    /// Creates a dispatcher over the given queue.
    pub fn new(queue: Arc<dyn WorkQueue>) -> Self {
        Self { queue }
    }

    /// Schedules the first generation round for a draft quiz.
    pub async fn schedule_start_quiz(&self, payload: &QuizJobPayload) -> Result<(), DomainError> {
        self.enqueue(
            names::START_QUIZ,
            json!(payload),
            quiz_cache_key(&payload.quiz_id),
            3,
        )
        .await
    }

    /// Schedules one item generation round.
    pub async fn schedule_generate_items(
        &self,
        payload: &QuizJobPayload,
    ) -> Result<(), DomainError> {
        self.enqueue(
            names::GENERATE_QUIZ_ITEMS,
            json!(payload),
            quiz_cache_key(&payload.quiz_id),
            3,
        )
        .await
    }

    /// Schedules quiz finalization (summary + search indexing).
    pub async fn schedule_finalize_quiz(
        &self,
        payload: &FinalizeQuizPayload,
    ) -> Result<(), DomainError> {
        self.enqueue(
            names::FINALIZE_QUIZ,
            json!(payload),
            quiz_cache_key(&payload.quiz_id),
            3,
        )
        .await
    }

    /// Schedules attempt finalization (feedback generation).
    pub async fn schedule_finalize_attempt(
        &self,
        payload: &FinalizeAttemptPayload,
    ) -> Result<(), DomainError> {
        self.enqueue(
            names::FINALIZE_ATTEMPT,
            json!(payload),
            attempt_cache_key(&payload.attempt_id),
            2,
        )
        .await
    }

    /// Schedules text extraction and indexing for a new material.
    pub async fn schedule_add_material(
        &self,
        payload: &MaterialJobPayload,
    ) -> Result<(), DomainError> {
        self.enqueue(
            names::ADD_MATERIAL,
            json!(payload),
            format!("material-{}", payload.material_id),
            2,
        )
        .await
    }

    /// Schedules material removal (object delete, deindex, record delete).
    pub async fn schedule_remove_material(
        &self,
        payload: &MaterialJobPayload,
    ) -> Result<(), DomainError> {
        self.enqueue(
            names::REMOVE_MATERIAL,
            json!(payload),
            format!("material-{}", payload.material_id),
            2,
        )
        .await
    }

    async fn enqueue(
        &self,
        job_name: &str,
        payload: serde_json::Value,
        cache_key: String,
        max_tries: u32,
    ) -> Result<(), DomainError> {
        let job = JobEnvelope::new(job_name, payload, cache_key.clone(), max_tries);
        self.queue
            .enqueue(job)
            .await
            .map_err(|e| DomainError::upstream(e.to_string()))?;
        tracing::debug!(job_name, cache_key, "job scheduled");
        Ok(())
    }
}

//! Quiz endpoints.
//!
//! All generation work is dispatched to the job queue; the handlers answer
//! `202` `{scheduled: true}` as soon as the envelope is queued.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::application::collections;
use crate::application::jobs::dispatcher::{FinalizeQuizPayload, QuizJobPayload};
use crate::application::jobs::handlers::{load_entity, store_err};
use crate::application::AppContext;
use crate::domain::billing::UsageCounter;
use crate::domain::foundation::{DomainError, QuizId, Timestamp, UserId};
use crate::domain::quiz::{Difficulty, DynamicConfig, Quiz};
use crate::ports::{Patch, Record};

use super::error::ApiError;
use super::middleware::CurrentUser;

const DEFAULT_ITEM_COUNT: u64 = 5;

#[derive(Debug, Deserialize)]
pub struct UpsertQuizRequest {
    pub title: String,
    pub topic: String,
    pub difficulty: Option<Difficulty>,
    /// Items to generate in the first round.
    pub item_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PatchQuizRequest {
    pub title: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    /// Steering directives for the next round.
    pub dynamic: Option<DynamicConfig>,
    /// When present, schedules another generation round.
    pub item_count: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct FinalizeQuizRequest {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct ScheduledResponse {
    pub scheduled: bool,
    pub quiz_id: String,
}

pub fn routes() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/:id", put(upsert_quiz).patch(patch_quiz))
        .route("/:id/finalize", post(finalize_quiz))
}

/// `PUT /quizzes/{id}` - create or replace a quiz and start generation.
///
/// The first round's quota is checked up front; an over-quota request is
/// rejected before anything is written or queued.
async fn upsert_quiz(
    State(ctx): State<Arc<AppContext>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpsertQuizRequest>,
) -> Result<(StatusCode, Json<ScheduledResponse>), ApiError> {
    let item_count = request.item_count.unwrap_or(DEFAULT_ITEM_COUNT);
    ctx.ledger
        .validate(&user_id, UsageCounter::QuizItems, item_count)
        .await?;

    let quiz_id = match ctx.store.get(collections::QUIZZES, &id).await {
        Ok(record) => {
            let quiz: Quiz = record.deserialize().map_err(store_err)?;
            authorize(&quiz.owner_id, &user_id)?;
            let mut patches = vec![
                Patch::set("title", request.title),
                Patch::set("topic", request.topic),
                Patch::set("updated_at", json!(Timestamp::now())),
            ];
            if let Some(difficulty) = request.difficulty {
                patches.push(Patch::set("difficulty", json!(difficulty)));
            }
            ctx.store
                .update(collections::QUIZZES, &record.id, patches)
                .await
                .map_err(store_err)?;
            record.id
        }
        Err(crate::ports::RecordStoreError::NotFound { .. }) => {
            let mut quiz = Quiz::new(
                QuizId::generate(),
                user_id.clone(),
                request.title,
                request.topic,
            );
            if let Some(difficulty) = request.difficulty {
                quiz.difficulty = difficulty;
            }
            let fields = Record::fields_from(&quiz).map_err(store_err)?;
            let record = ctx
                .store
                .create(collections::QUIZZES, fields)
                .await
                .map_err(store_err)?;
            record.id
        }
        Err(other) => return Err(store_err(other).into()),
    };

    let payload = QuizJobPayload {
        quiz_id: QuizId::new(quiz_id.clone()).map_err(validation)?,
        user_id,
        item_count,
        dynamic: DynamicConfig::default(),
    };
    ctx.dispatcher.schedule_start_quiz(&payload).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ScheduledResponse {
            scheduled: true,
            quiz_id,
        }),
    ))
}

/// `PATCH /quizzes/{id}` - update fields and steering; schedules a round
/// only when `item_count` is present.
///
/// An over-quota round request fails with `QuotaExceeded` before any field
/// is written and before any job is enqueued.
async fn patch_quiz(
    State(ctx): State<Arc<AppContext>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<PatchQuizRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let (record, quiz) =
        load_entity::<Quiz>(ctx.store.as_ref(), collections::QUIZZES, &id).await?;
    authorize(&quiz.owner_id, &user_id)?;

    if let Some(item_count) = request.item_count {
        ctx.ledger
            .validate(&user_id, UsageCounter::QuizItems, item_count)
            .await?;
    }

    let mut patches = Vec::new();
    if let Some(title) = request.title {
        patches.push(Patch::set("title", title));
    }
    if let Some(topic) = request.topic {
        patches.push(Patch::set("topic", topic));
    }
    if let Some(difficulty) = request.difficulty {
        patches.push(Patch::set("difficulty", json!(difficulty)));
    }
    if !patches.is_empty() {
        patches.push(Patch::set("updated_at", json!(Timestamp::now())));
        ctx.store
            .update(collections::QUIZZES, &record.id, patches)
            .await
            .map_err(store_err)?;
    }

    if let Some(item_count) = request.item_count {
        let payload = QuizJobPayload {
            quiz_id: QuizId::new(record.id.clone()).map_err(validation)?,
            user_id,
            item_count,
            dynamic: request.dynamic.unwrap_or_default(),
        };
        ctx.dispatcher.schedule_generate_items(&payload).await?;
        return Ok((
            StatusCode::ACCEPTED,
            Json(json!({ "scheduled": true, "quiz_id": record.id })),
        ));
    }

    Ok((
        StatusCode::OK,
        Json(json!({ "scheduled": false, "quiz_id": record.id })),
    ))
}

/// `POST /quizzes/{id}/finalize` - schedule summary generation and indexing.
async fn finalize_quiz(
    State(ctx): State<Arc<AppContext>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
    request: Option<Json<FinalizeQuizRequest>>,
) -> Result<(StatusCode, Json<ScheduledResponse>), ApiError> {
    let (record, quiz) =
        load_entity::<Quiz>(ctx.store.as_ref(), collections::QUIZZES, &id).await?;
    authorize(&quiz.owner_id, &user_id)?;

    let force = request.map(|Json(r)| r.force).unwrap_or(false);
    let payload = FinalizeQuizPayload {
        quiz_id: QuizId::new(record.id.clone()).map_err(validation)?,
        user_id,
        force,
    };
    ctx.dispatcher.schedule_finalize_quiz(&payload).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ScheduledResponse {
            scheduled: true,
            quiz_id: record.id,
        }),
    ))
}

pub(super) fn authorize(owner: &UserId, caller: &UserId) -> Result<(), DomainError> {
    if owner != caller {
        return Err(DomainError::forbidden("Not the owner of this resource"));
    }
    Ok(())
}

fn validation(err: crate::domain::foundation::ValidationError) -> DomainError {
    DomainError::new(
        crate::domain::foundation::ErrorCode::ValidationFailed,
        err.to_string(),
    )
}

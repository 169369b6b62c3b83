//! Attempt endpoints, including the explainer SSE stream.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post, put};
use axum::Router;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::application::collections;
use crate::application::jobs::dispatcher::FinalizeAttemptPayload;
use crate::application::jobs::handlers::{load_entity, store_err};
use crate::application::AppContext;
use crate::domain::attempt::{Attempt, Message, MessageRole};
use crate::domain::billing::UsageCounter;
use crate::domain::foundation::{
    AttemptId, DomainError, ErrorCode, MessageId, QuizId, Timestamp, UserId,
};
use crate::domain::generation::{attempt_cache_key, OutputMode};
use crate::domain::prompt::{AssemblyInput, HistoryTurn, SegmentRole};
use crate::domain::quiz::Quiz;
use crate::ports::{Filter, Patch, Record, SortOrder};

use super::error::ApiError;
use super::middleware::CurrentUser;
use super::quizzes::authorize;

#[derive(Debug, Deserialize)]
pub struct UpsertAttemptRequest {
    pub quiz_id: String,
    #[serde(default)]
    pub choices: Vec<ChoiceRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceRequest {
    pub item_id: String,
    pub idx: usize,
}

#[derive(Debug, Serialize)]
pub struct AttemptResponse {
    pub attempt_id: String,
    pub answered: usize,
    pub score: Option<f64>,
    pub finalized: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    /// The learner's question.
    pub q: String,
}

pub fn routes() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/:id", put(upsert_attempt))
        .route("/:id/finalize", post(finalize_attempt))
        .route("/:id/messages/sse", get(explain_sse))
}

/// `PUT /attempts/{id}` - record answered items.
///
/// Correctness is computed server-side against the quiz's answer key.
async fn upsert_attempt(
    State(ctx): State<Arc<AppContext>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpsertAttemptRequest>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let (_, quiz) =
        load_entity::<Quiz>(ctx.store.as_ref(), collections::QUIZZES, &request.quiz_id).await?;

    let answer_key: HashMap<&str, usize> = quiz
        .items
        .iter()
        .map(|item| (item.id.as_str(), item.correct_idx))
        .collect();

    let graded = |attempt: &mut Attempt| -> Result<(), DomainError> {
        for choice in &request.choices {
            let correct_idx = answer_key.get(choice.item_id.as_str()).ok_or_else(|| {
                DomainError::new(
                    ErrorCode::ValidationFailed,
                    format!("unknown quiz item '{}'", choice.item_id),
                )
            })?;
            attempt.record_choice(choice.item_id.clone(), choice.idx, choice.idx == *correct_idx);
        }
        Ok(())
    };

    let (record_id, attempt) = match ctx.store.get(collections::ATTEMPTS, &id).await {
        Ok(record) => {
            let mut attempt: Attempt = record.deserialize().map_err(store_err)?;
            authorize(&attempt.user_id, &user_id)?;
            attempt.choices.clear();
            graded(&mut attempt)?;
            ctx.store
                .update(
                    collections::ATTEMPTS,
                    &record.id,
                    vec![
                        Patch::set("choices", json!(attempt.choices)),
                        Patch::set("updated_at", json!(Timestamp::now())),
                    ],
                )
                .await
                .map_err(store_err)?;
            (record.id, attempt)
        }
        Err(crate::ports::RecordStoreError::NotFound { .. }) => {
            let quiz_id = QuizId::new(request.quiz_id.clone()).map_err(|e| {
                DomainError::new(ErrorCode::ValidationFailed, e.to_string())
            })?;
            let mut attempt = Attempt::new(AttemptId::generate(), user_id.clone(), quiz_id);
            graded(&mut attempt)?;
            let fields = Record::fields_from(&attempt).map_err(store_err)?;
            let record = ctx
                .store
                .create(collections::ATTEMPTS, fields)
                .await
                .map_err(store_err)?;
            (record.id, attempt)
        }
        Err(other) => return Err(store_err(other).into()),
    };

    Ok(Json(AttemptResponse {
        attempt_id: record_id,
        answered: attempt.choices.len(),
        score: attempt.score(),
        finalized: attempt.is_finalized(),
    }))
}

/// `POST /attempts/{id}/finalize` - schedule feedback generation.
async fn finalize_attempt(
    State(ctx): State<Arc<AppContext>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let (record, attempt) =
        load_entity::<Attempt>(ctx.store.as_ref(), collections::ATTEMPTS, &id).await?;
    authorize(&attempt.user_id, &user_id)?;

    let payload = FinalizeAttemptPayload {
        attempt_id: AttemptId::new(record.id.clone())
            .map_err(|e| DomainError::new(ErrorCode::ValidationFailed, e.to_string()))?,
        user_id,
    };
    ctx.dispatcher.schedule_finalize_attempt(&payload).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "scheduled": true, "attempt_id": record.id })),
    ))
}

/// Upper bound on prior turns fed back into the prompt.
const HISTORY_LIMIT: usize = 50;

/// `GET /attempts/{id}/messages/sse?q=` - streamed answer explanation.
///
/// Quota is validated before the stream opens; the message charge lands in
/// the streaming bridge once the provider stream runs to completion. Prior
/// finalized turns of the attempt are replayed into the prompt so follow-up
/// questions keep their context.
async fn explain_sse(
    State(ctx): State<Arc<AppContext>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<ExplainQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let (record, attempt) =
        load_entity::<Attempt>(ctx.store.as_ref(), collections::ATTEMPTS, &id).await?;
    authorize(&attempt.user_id, &user_id)?;

    ctx.ledger
        .validate(&user_id, UsageCounter::Messages, 1)
        .await?;

    let (_, quiz) = load_entity::<Quiz>(
        ctx.store.as_ref(),
        collections::QUIZZES,
        attempt.quiz_id.as_str(),
    )
    .await?;

    let attempt_id = AttemptId::new(record.id.clone())
        .map_err(|e| DomainError::new(ErrorCode::ValidationFailed, e.to_string()))?;

    let history = load_history(&ctx, &record.id).await?;

    // The learner's question is persisted before the reply starts streaming.
    let user_message = Message::user(attempt_id.clone(), &query.q);
    let fields = Record::fields_from(&user_message)
        .map_err(|e| DomainError::upstream(e.to_string()))?;
    let user_record = ctx
        .store
        .create(collections::MESSAGES, fields)
        .await
        .map_err(store_err)?;

    let cache_key = attempt_cache_key(&attempt_id);
    let input = AssemblyInput {
        history,
        user_query: Some(query.q.clone()),
        difficulty: Some(quiz.difficulty),
        ..AssemblyInput::default()
    };
    let params = HashMap::from([("topic".to_string(), quiz.topic.clone())]);

    let stream = ctx
        .runner
        .run_stream(OutputMode::Explanation, &input, &params, &cache_key, &user_id)
        .await?;
    let session = ctx.bridge.start(&user_id, &attempt_id, stream).await?;

    // Both new messages become part of the attempt's conversation record.
    let mut message_history = attempt.message_history.clone();
    for id in [&user_record.id, &session.message_id] {
        message_history.push(
            MessageId::new(id.clone())
                .map_err(|e| DomainError::new(ErrorCode::ValidationFailed, e.to_string()))?,
        );
    }
    ctx.store
        .update(
            collections::ATTEMPTS,
            &record.id,
            vec![
                Patch::set("message_history", json!(message_history)),
                Patch::set("updated_at", json!(Timestamp::now())),
            ],
        )
        .await
        .map_err(store_err)?;

    let events = futures::stream::unfold(session.events, |mut receiver| async move {
        let event = receiver.recv().await?;
        Some((Event::default().event("chunk").json_data(&event), receiver))
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Loads the attempt's finished turns as prompt history, oldest first.
async fn load_history(ctx: &AppContext, attempt_id: &str) -> Result<Vec<HistoryTurn>, ApiError> {
    let records = ctx
        .store
        .get_full_list(
            collections::MESSAGES,
            &Filter::eq("attempt_id", attempt_id),
            SortOrder::CreatedAsc,
            HISTORY_LIMIT,
        )
        .await
        .map_err(store_err)?;

    let mut history = Vec::new();
    for record in records {
        let message: Message = record.deserialize().map_err(store_err)?;
        // In-flight or abandoned-empty turns carry no prompt value.
        if !message.is_final() || message.content.is_empty() {
            continue;
        }
        history.push(HistoryTurn {
            role: match message.role {
                MessageRole::User => SegmentRole::User,
                MessageRole::Ai => SegmentRole::Assistant,
            },
            content: message.content,
        });
    }
    Ok(history)
}

//! Moves a draft quiz into generation and schedules the first item round.

use serde_json::json;

use crate::application::collections;
use crate::application::context::AppContext;
use crate::application::jobs::dispatcher::QuizJobPayload;
use crate::domain::billing::UsageCounter;
use crate::domain::foundation::{DomainError, StateMachine};
use crate::domain::quiz::{Quiz, QuizStatus};
use crate::ports::Patch;

use super::{load_entity, store_err};

pub async fn run(ctx: &AppContext, payload: QuizJobPayload) -> Result<(), DomainError> {
    // Reject before any state change or queued work; a rejected request is
    // never charged.
    ctx.ledger
        .validate(&payload.user_id, UsageCounter::QuizItems, payload.item_count)
        .await?;

    let (record, quiz) = load_entity::<Quiz>(
        ctx.store.as_ref(),
        collections::QUIZZES,
        payload.quiz_id.as_str(),
    )
    .await?;

    // Re-delivered start jobs find the quiz already generating; skip the
    // transition instead of failing the retry.
    if quiz.status != QuizStatus::Generating {
        let next = quiz.status.transition_to(QuizStatus::Generating)?;
        ctx.store
            .update(
                collections::QUIZZES,
                &record.id,
                vec![Patch::set("status", json!(next))],
            )
            .await
            .map_err(store_err)?;
    }

    ctx.dispatcher.schedule_generate_items(&payload).await?;
    tracing::info!(quiz_id = %payload.quiz_id, item_count = payload.item_count, "quiz generation started");
    Ok(())
}

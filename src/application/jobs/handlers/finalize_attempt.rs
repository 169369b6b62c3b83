//! Attempt finalization: end-of-attempt feedback.
//!
//! Feedback is written at most once. Free-tariff users get an empty
//! placeholder instead of a model call, which still marks the attempt
//! finalized and costs nothing.

use std::collections::HashMap;

use serde_json::json;

use crate::application::collections;
use crate::application::context::AppContext;
use crate::application::jobs::dispatcher::FinalizeAttemptPayload;
use crate::domain::attempt::Attempt;
use crate::domain::billing::UsageCounter;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::generation::{attempt_cache_key, GenerationOutput, OutputMode};
use crate::domain::prompt::AssemblyInput;
use crate::domain::quiz::Quiz;
use crate::ports::Patch;

use super::{load_entity, store_err};

pub async fn run(ctx: &AppContext, payload: FinalizeAttemptPayload) -> Result<(), DomainError> {
    let (record, attempt) = load_entity::<Attempt>(
        ctx.store.as_ref(),
        collections::ATTEMPTS,
        payload.attempt_id.as_str(),
    )
    .await?;

    if attempt.is_finalized() {
        tracing::info!(attempt_id = %payload.attempt_id, "attempt already finalized");
        return Ok(());
    }

    let subscription = ctx.ledger.subscription(&payload.user_id).await?;
    if !subscription.tariff.is_paid() {
        // Placeholder feedback closes the attempt without touching the model.
        persist_feedback(ctx, &record.id, "").await?;
        tracing::info!(attempt_id = %payload.attempt_id, "free-tariff attempt closed with placeholder feedback");
        return Ok(());
    }

    ctx.ledger
        .validate(&payload.user_id, UsageCounter::Messages, 1)
        .await?;

    let (_, quiz) = load_entity::<Quiz>(
        ctx.store.as_ref(),
        collections::QUIZZES,
        attempt.quiz_id.as_str(),
    )
    .await?;

    let cache_key = attempt_cache_key(&payload.attempt_id);
    let input = AssemblyInput {
        user_query: Some(attempt_digest(&attempt, &quiz)),
        difficulty: Some(quiz.difficulty),
        ..AssemblyInput::default()
    };
    let run = ctx
        .runner
        .run(
            OutputMode::Feedback,
            &input,
            &HashMap::new(),
            &cache_key,
            &payload.user_id,
        )
        .await?;
    let GenerationOutput::Feedback(feedback) = run.output else {
        return Err(DomainError::new(
            ErrorCode::UnexpectedOutputType,
            "attempt finalize produced non-feedback output",
        ));
    };

    persist_feedback(ctx, &record.id, &feedback.text).await?;

    ctx.ledger
        .charge(&payload.user_id, UsageCounter::Messages, 1)
        .await?;

    tracing::info!(attempt_id = %payload.attempt_id, cost = run.cost, "attempt feedback generated");
    Ok(())
}

async fn persist_feedback(
    ctx: &AppContext,
    record_id: &str,
    feedback: &str,
) -> Result<(), DomainError> {
    ctx.store
        .update(
            collections::ATTEMPTS,
            record_id,
            vec![
                Patch::set("feedback", feedback),
                Patch::set("updated_at", json!(Timestamp::now())),
            ],
        )
        .await
        .map_err(store_err)?;
    Ok(())
}

/// Flattens the finished attempt into the feedback prompt's user turn.
fn attempt_digest(attempt: &Attempt, quiz: &Quiz) -> String {
    let mut digest = format!("Quiz: {}\n", quiz.title);
    if let Some(score) = attempt.score() {
        digest.push_str(&format!("Score: {:.0}%\n", score * 100.0));
    }
    digest.push_str("Answers:\n");
    for choice in &attempt.choices {
        let question = quiz
            .items
            .iter()
            .find(|i| i.id == choice.item_id)
            .map(|i| i.question.as_str())
            .unwrap_or(choice.item_id.as_str());
        let verdict = if choice.correct { "correct" } else { "wrong" };
        digest.push_str(&format!("- {} ({})\n", question, verdict));
    }
    digest
}

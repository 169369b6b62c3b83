//! Quiz finalization: summary generation, status transition, search indexing.
//!
//! Finalizing an already-final quiz without `force` is an idempotent no-op
//! that performs zero model calls and zero index writes.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::json;

use crate::application::collections;
use crate::application::context::AppContext;
use crate::application::indexes;
use crate::application::jobs::dispatcher::FinalizeQuizPayload;
use crate::domain::foundation::{DomainError, StateMachine, Timestamp};
use crate::domain::generation::{quiz_cache_key, GenerationOutput, OutputMode};
use crate::domain::prompt::AssemblyInput;
use crate::domain::quiz::{Quiz, QuizStatus};
use crate::ports::{Patch, SearchDocument};

use super::{load_entity, store_err};

const INDEX_WAIT: Duration = Duration::from_secs(10);
const INDEX_POLL: Duration = Duration::from_millis(250);

pub async fn run(ctx: &AppContext, payload: FinalizeQuizPayload) -> Result<(), DomainError> {
    let lock_key = quiz_cache_key(&payload.quiz_id);
    ctx.locks
        .with_lock(&lock_key, || finalize(ctx, &payload, &lock_key))
        .await
}

async fn finalize(
    ctx: &AppContext,
    payload: &FinalizeQuizPayload,
    cache_key: &str,
) -> Result<(), DomainError> {
    let (record, quiz) = load_entity::<Quiz>(
        ctx.store.as_ref(),
        collections::QUIZZES,
        payload.quiz_id.as_str(),
    )
    .await?;

    if quiz.is_final() && !payload.force {
        tracing::info!(quiz_id = %payload.quiz_id, "quiz already final, nothing to do");
        return Ok(());
    }

    let input = AssemblyInput {
        user_query: Some(quiz_digest(&quiz)),
        ..AssemblyInput::default()
    };
    let run = ctx
        .runner
        .run(
            OutputMode::Summary,
            &input,
            &HashMap::new(),
            cache_key,
            &payload.user_id,
        )
        .await?;
    let GenerationOutput::Summary(summary) = run.output else {
        return Err(DomainError::new(
            crate::domain::foundation::ErrorCode::UnexpectedOutputType,
            "finalize produced non-summary output",
        ));
    };

    let mut patches = vec![
        Patch::set("summary", summary.summary.clone()),
        Patch::set("updated_at", json!(Timestamp::now())),
    ];
    if !quiz.is_final() {
        let next = quiz.status.transition_to(QuizStatus::Final)?;
        patches.push(Patch::set("status", json!(next)));
    }
    ctx.store
        .update(collections::QUIZZES, &record.id, patches)
        .await
        .map_err(store_err)?;

    let document = SearchDocument {
        id: record.id.clone(),
        fields: json!({
            "title": quiz.title,
            "topic": quiz.topic,
            "summary": summary.summary,
            "keywords": summary.keywords,
            "owner_id": quiz.owner_id.as_str(),
            "item_count": quiz.items.len(),
        }),
    };
    let task = ctx
        .search
        .add_documents(indexes::QUIZZES, vec![document], "id")
        .await
        .map_err(|e| DomainError::upstream(e.to_string()))?;
    ctx.search
        .wait_for_task(task, INDEX_WAIT, INDEX_POLL)
        .await
        .map_err(|e| DomainError::upstream(e.to_string()))?;

    tracing::info!(quiz_id = %payload.quiz_id, cost = run.cost, "quiz finalized and indexed");
    Ok(())
}

/// Flattens the quiz into the summary prompt's user turn.
fn quiz_digest(quiz: &Quiz) -> String {
    let mut digest = format!("Title: {}\nTopic: {}\nQuestions:\n", quiz.title, quiz.topic);
    for item in &quiz.items {
        digest.push_str("- ");
        digest.push_str(&item.question);
        digest.push('\n');
    }
    digest
}

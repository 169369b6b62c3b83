//! One item generation round for a quiz.
//!
//! The round runs under the quiz's entity lock so concurrent rounds never
//! interleave their item appends. Quota is validated inside the lock, right
//! before the model call; the charge lands after the items are persisted.

use std::collections::HashMap;

use serde_json::json;
use uuid::Uuid;

use crate::application::collections;
use crate::application::context::AppContext;
use crate::application::jobs::dispatcher::QuizJobPayload;
use crate::domain::billing::UsageCounter;
use crate::domain::foundation::{DomainError, StateMachine, Timestamp};
use crate::domain::generation::{quiz_cache_key, GenerationOutput, OutputMode};
use crate::domain::prompt::AssemblyInput;
use crate::domain::quiz::{Material, Quiz, QuizStatus};
use crate::ports::{Filter, Patch, SortOrder};

use super::{load_entity, store_err};

pub async fn run(ctx: &AppContext, payload: QuizJobPayload) -> Result<(), DomainError> {
    let lock_key = quiz_cache_key(&payload.quiz_id);
    ctx.locks
        .with_lock(&lock_key, || generate_round(ctx, &payload, &lock_key))
        .await
}

async fn generate_round(
    ctx: &AppContext,
    payload: &QuizJobPayload,
    cache_key: &str,
) -> Result<(), DomainError> {
    let (record, quiz) = load_entity::<Quiz>(
        ctx.store.as_ref(),
        collections::QUIZZES,
        payload.quiz_id.as_str(),
    )
    .await?;

    // Finalized quizzes are frozen; a stale or duplicate round is a no-op.
    if quiz.is_final() {
        tracing::info!(quiz_id = %payload.quiz_id, "quiz already final, skipping round");
        return Ok(());
    }

    ctx.ledger
        .validate(&payload.user_id, UsageCounter::QuizItems, payload.item_count)
        .await?;

    let input = assembly_input(ctx, &quiz, payload).await?;
    let params = HashMap::from([
        ("topic".to_string(), quiz.topic.clone()),
        ("item_count".to_string(), payload.item_count.to_string()),
    ]);

    let run = ctx
        .runner
        .run(
            OutputMode::Quiz,
            &input,
            &params,
            cache_key,
            &payload.user_id,
        )
        .await?;

    let GenerationOutput::Quiz(generated) = run.output else {
        // The runner already mode-checked; this is unreachable in practice.
        return Err(DomainError::new(
            crate::domain::foundation::ErrorCode::UnexpectedOutputType,
            "quiz round produced non-quiz output",
        ));
    };

    let mut items = quiz.items.clone();
    for mut item in generated.items {
        if item.id.is_empty() {
            item.id = Uuid::new_v4().simple().to_string();
        }
        items.push(item);
    }
    let generated_count = (items.len() - quiz.items.len()) as u64;

    let mut patches = vec![
        Patch::set("items", json!(items)),
        Patch::set("updated_at", json!(Timestamp::now())),
    ];
    if quiz.status == QuizStatus::Generating {
        let next = quiz.status.transition_to(QuizStatus::Draft)?;
        patches.push(Patch::set("status", json!(next)));
    }
    ctx.store
        .update(collections::QUIZZES, &record.id, patches)
        .await
        .map_err(store_err)?;

    // The round succeeded; the charge is unconditional.
    ctx.ledger
        .charge(&payload.user_id, UsageCounter::QuizItems, generated_count)
        .await?;

    tracing::info!(
        quiz_id = %payload.quiz_id,
        generated = generated_count,
        cost = run.cost,
        "generation round complete"
    );
    Ok(())
}

/// Snapshots the quiz state the prompt reads.
async fn assembly_input(
    ctx: &AppContext,
    quiz: &Quiz,
    payload: &QuizJobPayload,
) -> Result<AssemblyInput, DomainError> {
    let material_records = ctx
        .store
        .get_full_list(
            collections::MATERIALS,
            &Filter::eq("quiz_id", quiz.id.as_str()),
            SortOrder::CreatedAsc,
            100,
        )
        .await
        .map_err(store_err)?;

    let mut material_texts = Vec::new();
    let mut material_refs = Vec::new();
    for record in material_records {
        let material: Material = record.deserialize().map_err(store_err)?;
        if let Some(text) = &material.extracted_text {
            material_texts.push(text.clone());
        }
        material_refs.push(material.reference());
    }

    Ok(AssemblyInput {
        history: Vec::new(),
        user_query: None,
        material_texts,
        material_refs,
        dynamic: payload.dynamic.clone(),
        previous_questions: quiz
            .existing_questions()
            .into_iter()
            .map(str::to_string)
            .collect(),
        difficulty: Some(quiz.difficulty),
        materials_context: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::test_context;
    use crate::domain::foundation::{ErrorCode, QuizId, UserId};
    use crate::domain::generation::TokenUsage;
    use crate::domain::quiz::DynamicConfig;
    use crate::ports::{EntityLock, Record};

    fn payload(item_count: u64) -> QuizJobPayload {
        QuizJobPayload {
            quiz_id: QuizId::new("q1").unwrap(),
            user_id: UserId::new("u1").unwrap(),
            item_count,
            dynamic: DynamicConfig::default(),
        }
    }

    fn quiz_reply(count: usize) -> String {
        let items: Vec<String> = (0..count)
            .map(|n| {
                format!(
                    r#"{{"id":"","question":"Q{n}?","options":["a","b","c"],"correct_idx":0,"rationale":null}}"#
                )
            })
            .collect();
        format!(r#"{{"mode":"quiz","items":[{}]}}"#, items.join(","))
    }

    async fn seed_quiz(fixtures: &crate::application::testing::TestFixtures, status: QuizStatus) {
        let mut quiz = Quiz::new(
            QuizId::new("q1").unwrap(),
            UserId::new("u1").unwrap(),
            "Rivers",
            "world rivers",
        );
        quiz.status = status;
        fixtures
            .store
            .seed(
                collections::QUIZZES,
                "q1",
                Record::fields_from(&quiz).unwrap(),
            )
            .await;
    }

    #[tokio::test]
    async fn round_appends_items_and_charges_generated_count() {
        let (ctx, fixtures) = test_context().await;
        seed_quiz(&fixtures, QuizStatus::Generating).await;
        fixtures
            .provider
            .push_reply(quiz_reply(3), TokenUsage::new(100, 0, 50))
            .await;

        run(&ctx, payload(3)).await.unwrap();

        let (_, quiz) = load_entity::<Quiz>(ctx.store.as_ref(), collections::QUIZZES, "q1")
            .await
            .unwrap();
        assert_eq!(quiz.items.len(), 3);
        assert!(quiz.items.iter().all(|i| !i.id.is_empty()));
        assert_eq!(quiz.status, QuizStatus::Draft);

        let subscription = ctx
            .ledger
            .subscription(&UserId::new("u1").unwrap())
            .await
            .unwrap();
        assert_eq!(subscription.quiz_items_usage, 3);

        // The call used the quiz's stable cache key.
        assert_eq!(fixtures.provider.requests().await[0].cache_key, "quiz-q1");
    }

    #[tokio::test]
    async fn over_quota_round_makes_no_model_call() {
        let (ctx, fixtures) = test_context().await;
        seed_quiz(&fixtures, QuizStatus::Generating).await;

        let err = run(&ctx, payload(31)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::QuotaExceeded);
        assert_eq!(fixtures.provider.call_count().await, 0);
    }

    #[tokio::test]
    async fn final_quiz_round_is_a_no_op() {
        let (ctx, fixtures) = test_context().await;
        seed_quiz(&fixtures, QuizStatus::Final).await;

        run(&ctx, payload(3)).await.unwrap();
        assert_eq!(fixtures.provider.call_count().await, 0);
    }

    #[tokio::test]
    async fn excludes_existing_questions_from_the_prompt() {
        let (ctx, fixtures) = test_context().await;
        let mut quiz = Quiz::new(
            QuizId::new("q1").unwrap(),
            UserId::new("u1").unwrap(),
            "Rivers",
            "world rivers",
        );
        quiz.status = QuizStatus::Generating;
        quiz.items.push(crate::domain::quiz::QuizItem {
            id: "i0".into(),
            question: "Existing question?".into(),
            options: vec!["a".into(), "b".into()],
            correct_idx: 0,
            rationale: None,
        });
        fixtures
            .store
            .seed(
                collections::QUIZZES,
                "q1",
                Record::fields_from(&quiz).unwrap(),
            )
            .await;
        fixtures
            .provider
            .push_reply(quiz_reply(1), TokenUsage::zero())
            .await;

        run(&ctx, payload(1)).await.unwrap();

        let request = &fixtures.provider.requests().await[0];
        let exclusion = request
            .segments
            .iter()
            .find(|s| s.text.contains("Do not repeat any of these existing questions:"))
            .expect("exclusion block present");
        assert!(exclusion.text.contains("Existing question?"));
    }

    #[tokio::test]
    async fn contended_quiz_lock_times_out() {
        let (ctx, fixtures) = test_context().await;
        seed_quiz(&fixtures, QuizStatus::Generating).await;
        fixtures
            .lock
            .try_acquire("quiz-q1", std::time::Duration::from_secs(60))
            .await
            .unwrap()
            .unwrap();

        let err = run(&ctx, payload(1)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::LockTimeout);
        assert_eq!(fixtures.provider.call_count().await, 0);
    }
}

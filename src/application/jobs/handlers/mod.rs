//! Job handlers - one module per job name.
//!
//! Handlers are plain async functions over `AppContext`. The worker routes
//! envelopes here; payloads were minted by the dispatcher from an already
//! authorized request, so `user_id` inside a payload is trusted.

mod add_material;
mod finalize_attempt;
mod finalize_quiz;
mod generate_items;
mod remove_material;
mod start_quiz;

use serde::de::DeserializeOwned;

use crate::application::context::AppContext;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{JobEnvelope, Record, RecordStore, RecordStoreError};

use super::names;

/// Routes one job to its handler.
pub async fn dispatch(ctx: &AppContext, job: &JobEnvelope) -> Result<(), DomainError> {
    match job.job_name.as_str() {
        names::START_QUIZ => start_quiz::run(ctx, parse_payload(job)?).await,
        names::GENERATE_QUIZ_ITEMS => generate_items::run(ctx, parse_payload(job)?).await,
        names::FINALIZE_QUIZ => finalize_quiz::run(ctx, parse_payload(job)?).await,
        names::FINALIZE_ATTEMPT => finalize_attempt::run(ctx, parse_payload(job)?).await,
        names::ADD_MATERIAL => add_material::run(ctx, parse_payload(job)?).await,
        names::REMOVE_MATERIAL => remove_material::run(ctx, parse_payload(job)?).await,
        other => Err(DomainError::new(
            ErrorCode::InternalError,
            format!("unknown job '{}'", other),
        )),
    }
}

fn parse_payload<T: DeserializeOwned>(job: &JobEnvelope) -> Result<T, DomainError> {
    serde_json::from_value(job.payload.clone()).map_err(|e| {
        DomainError::new(
            ErrorCode::InternalError,
            format!("malformed {} payload: {}", job.job_name, e),
        )
    })
}

pub(crate) fn store_err(err: RecordStoreError) -> DomainError {
    match err {
        RecordStoreError::NotFound { collection, id } => DomainError::new(
            not_found_code(&collection),
            format!("{}/{} not found", collection, id),
        ),
        other => DomainError::upstream(other.to_string()),
    }
}

fn not_found_code(collection: &str) -> ErrorCode {
    use crate::application::collections as col;
    match collection {
        col::QUIZZES => ErrorCode::QuizNotFound,
        col::ATTEMPTS => ErrorCode::AttemptNotFound,
        col::MATERIALS => ErrorCode::MaterialNotFound,
        col::MESSAGES => ErrorCode::MessageNotFound,
        col::SUBSCRIPTIONS => ErrorCode::SubscriptionNotFound,
        _ => ErrorCode::InternalError,
    }
}

/// Loads and deserializes one record.
pub(crate) async fn load_entity<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: &str,
    id: &str,
) -> Result<(Record, T), DomainError> {
    let record = store.get(collection, id).await.map_err(store_err)?;
    let entity = record.deserialize::<T>().map_err(store_err)?;
    Ok((record, entity))
}

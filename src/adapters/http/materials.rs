//! Material endpoints.
//!
//! Uploads are checked against the storage byte limit before any write.
//! Text extraction, indexing, and removal all run in the background; both
//! endpoints answer `202` once the job is queued.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::application::collections;
use crate::application::jobs::dispatcher::MaterialJobPayload;
use crate::application::jobs::handlers::{load_entity, store_err};
use crate::application::AppContext;
use crate::domain::foundation::{DomainError, ErrorCode, MaterialId, QuizId, Timestamp};
use crate::domain::quiz::{Material, MaterialSource};
use crate::ports::Record;

use super::error::ApiError;
use super::middleware::CurrentUser;
use super::quizzes::authorize;

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaterialUpload {
    /// Inline document content.
    Upload { filename: String, content: String },
    /// Remote document by URL.
    Url { url: String },
}

#[derive(Debug, Deserialize)]
pub struct CreateMaterialRequest {
    pub quiz_id: String,
    #[serde(flatten)]
    pub source: MaterialUpload,
}

pub fn routes() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/", post(create_material))
        .route("/:id", axum::routing::delete(delete_material))
}

/// `POST /materials` - attach a material to a quiz.
async fn create_material(
    State(ctx): State<Arc<AppContext>>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<CreateMaterialRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let (_, quiz) =
        load_entity::<crate::domain::quiz::Quiz>(ctx.store.as_ref(), collections::QUIZZES, &request.quiz_id)
            .await?;
    authorize(&quiz.owner_id, &user_id)?;

    let (source, byte_size) = match request.source {
        MaterialUpload::Upload { filename, content } => {
            let bytes = content.into_bytes();
            let byte_size = bytes.len() as u64;
            ctx.ledger.validate_storage(&user_id, byte_size).await?;

            let storage_path = format!(
                "materials/{}-{}",
                Uuid::new_v4().simple(),
                filename
            );
            ctx.storage
                .put(&storage_path, bytes)
                .await
                .map_err(|e| DomainError::upstream(e.to_string()))?;
            (
                MaterialSource::Upload {
                    storage_path,
                    filename,
                },
                byte_size,
            )
        }
        MaterialUpload::Url { url } => (MaterialSource::Url { url }, 0),
    };

    let material = Material {
        id: MaterialId::generate(),
        owner_id: user_id.clone(),
        quiz_id: QuizId::new(request.quiz_id.clone())
            .map_err(|e| DomainError::new(ErrorCode::ValidationFailed, e.to_string()))?,
        source,
        extracted_text: None,
        byte_size,
        created_at: Timestamp::now(),
    };
    let fields = Record::fields_from(&material).map_err(store_err)?;
    let record = ctx
        .store
        .create(collections::MATERIALS, fields)
        .await
        .map_err(store_err)?;

    if byte_size > 0 {
        ctx.ledger.charge_storage(&user_id, byte_size as i64).await?;
    }

    let payload = MaterialJobPayload {
        material_id: MaterialId::new(record.id.clone())
            .map_err(|e| DomainError::new(ErrorCode::ValidationFailed, e.to_string()))?,
        user_id,
    };
    ctx.dispatcher.schedule_add_material(&payload).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "scheduled": true, "material_id": record.id })),
    ))
}

/// `DELETE /materials/{id}` - schedule removal of a material.
///
/// Only ownership is checked inline; the object delete, deindex, record
/// delete, and byte release happen in the background job.
async fn delete_material(
    State(ctx): State<Arc<AppContext>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let (record, material) =
        load_entity::<Material>(ctx.store.as_ref(), collections::MATERIALS, &id).await?;
    authorize(&material.owner_id, &user_id)?;

    let payload = MaterialJobPayload {
        material_id: MaterialId::new(record.id.clone())
            .map_err(|e| DomainError::new(ErrorCode::ValidationFailed, e.to_string()))?,
        user_id,
    };
    ctx.dispatcher.schedule_remove_material(&payload).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "scheduled": true, "material_id": record.id })),
    ))
}

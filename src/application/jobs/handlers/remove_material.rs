//! Material removal: object delete, deindex, record delete, quota release.
//!
//! The record delete happens before the quota release, so a job re-delivered
//! after the delete finds the record gone and returns without releasing the
//! bytes a second time. A re-delivery after a failed earlier step re-runs the
//! remaining steps; object and index deletes tolerate already-absent targets.

use std::time::Duration;

use crate::application::context::AppContext;
use crate::application::jobs::dispatcher::MaterialJobPayload;
use crate::application::{collections, indexes};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::quiz::{Material, MaterialSource};

use super::{load_entity, store_err};

const INDEX_WAIT: Duration = Duration::from_secs(10);
const INDEX_POLL: Duration = Duration::from_millis(250);

pub async fn run(ctx: &AppContext, payload: MaterialJobPayload) -> Result<(), DomainError> {
    let loaded = load_entity::<Material>(
        ctx.store.as_ref(),
        collections::MATERIALS,
        payload.material_id.as_str(),
    )
    .await;
    let (record, material) = match loaded {
        Ok(pair) => pair,
        Err(err) if err.code == ErrorCode::MaterialNotFound => {
            tracing::info!(material_id = %payload.material_id, "material already removed");
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    if let MaterialSource::Upload { storage_path, .. } = &material.source {
        ctx.storage
            .delete(storage_path)
            .await
            .map_err(|e| DomainError::upstream(e.to_string()))?;
    }

    let task = ctx
        .search
        .delete_documents(indexes::MATERIALS, vec![record.id.clone()])
        .await
        .map_err(|e| DomainError::upstream(e.to_string()))?;
    ctx.search
        .wait_for_task(task, INDEX_WAIT, INDEX_POLL)
        .await
        .map_err(|e| DomainError::upstream(e.to_string()))?;

    ctx.store
        .delete(collections::MATERIALS, &record.id)
        .await
        .map_err(store_err)?;

    if material.byte_size > 0 {
        ctx.ledger
            .charge_storage(&payload.user_id, -(material.byte_size as i64))
            .await?;
    }

    tracing::info!(
        material_id = %payload.material_id,
        bytes = material.byte_size,
        "material removed and deindexed"
    );
    Ok(())
}

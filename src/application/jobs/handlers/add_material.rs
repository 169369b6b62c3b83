//! Text extraction and search indexing for new study materials.
//!
//! Re-delivered jobs find `extracted_text` already set and skip the parse,
//! but the index write runs every time: document upserts are idempotent, so
//! a retry after a failed index step still converges.
//! URL materials carry no stored bytes; their reference line is all the
//! prompt assembler needs, so they are indexed unparsed.

use std::time::Duration;

use serde_json::json;

use crate::application::context::AppContext;
use crate::application::jobs::dispatcher::MaterialJobPayload;
use crate::application::{collections, indexes};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::quiz::{Material, MaterialSource};
use crate::ports::{ParseError, Patch, SearchDocument};

use super::{load_entity, store_err};

const INDEX_WAIT: Duration = Duration::from_secs(10);
const INDEX_POLL: Duration = Duration::from_millis(250);

pub async fn run(ctx: &AppContext, payload: MaterialJobPayload) -> Result<(), DomainError> {
    let (record, material) = load_entity::<Material>(
        ctx.store.as_ref(),
        collections::MATERIALS,
        payload.material_id.as_str(),
    )
    .await?;

    let extracted_text = match (&material.source, &material.extracted_text) {
        (_, Some(text)) => {
            tracing::info!(material_id = %payload.material_id, "material already extracted");
            Some(text.clone())
        }
        (MaterialSource::Url { url }, None) => {
            tracing::info!(material_id = %payload.material_id, url = %url, "url material needs no extraction");
            None
        }
        (
            MaterialSource::Upload {
                storage_path,
                filename,
            },
            None,
        ) => {
            let bytes = ctx
                .storage
                .get(storage_path)
                .await
                .map_err(|e| DomainError::upstream(e.to_string()))?;
            let parsed = ctx
                .parser
                .parse(&bytes, filename)
                .await
                .map_err(parse_err)?;

            ctx.store
                .update(
                    collections::MATERIALS,
                    &record.id,
                    vec![Patch::set("extracted_text", parsed.text.clone())],
                )
                .await
                .map_err(store_err)?;

            tracing::info!(
                material_id = %payload.material_id,
                bytes = bytes.len(),
                sections = parsed.section_count,
                "material text extracted"
            );
            Some(parsed.text)
        }
    };

    let document = SearchDocument {
        id: record.id.clone(),
        fields: json!({
            "quiz_id": material.quiz_id,
            "owner_id": material.owner_id,
            "reference": material.reference(),
            "text": extracted_text.unwrap_or_default(),
        }),
    };
    let task = ctx
        .search
        .add_documents(indexes::MATERIALS, vec![document], "id")
        .await
        .map_err(|e| DomainError::upstream(e.to_string()))?;
    ctx.search
        .wait_for_task(task, INDEX_WAIT, INDEX_POLL)
        .await
        .map_err(|e| DomainError::upstream(e.to_string()))?;

    tracing::info!(material_id = %payload.material_id, "material indexed");
    Ok(())
}

fn parse_err(err: ParseError) -> DomainError {
    match err {
        ParseError::UnsupportedFormat(_) | ParseError::Malformed(_) => {
            DomainError::new(ErrorCode::ValidationFailed, err.to_string())
                .with_detail("stage", "extraction")
        }
        ParseError::Unavailable(msg) => DomainError::upstream(msg),
    }
}

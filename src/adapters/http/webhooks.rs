//! Billing webhook endpoint.
//!
//! Signature verification happens upstream at the payment collaborator's
//! edge; this endpoint trusts the event body and applies it.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use serde_json::json;

use crate::application::billing_webhook::{BillingEvent, WebhookProcessor};
use crate::application::AppContext;

use super::error::ApiError;

pub fn routes() -> Router<Arc<AppContext>> {
    Router::new().route("/billing", post(handle_billing_event))
}

/// `POST /webhooks/billing` - apply one subscription-change event.
async fn handle_billing_event(
    State(ctx): State<Arc<AppContext>>,
    Json(event): Json<BillingEvent>,
) -> Result<impl IntoResponse, ApiError> {
    let processor = WebhookProcessor::new(ctx.ledger.clone());
    processor.process(event).await?;
    Ok(Json(json!({ "processed": true })))
}

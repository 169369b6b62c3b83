//! HTTP surface - axum routers over the application context.
//!
//! All resource routes sit behind the bearer-token auth middleware; the
//! billing webhook and health check do not.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::application::AppContext;

pub mod attempts;
pub mod error;
pub mod materials;
pub mod middleware;
pub mod quizzes;
pub mod webhooks;

pub use error::ApiError;
pub use middleware::CurrentUser;

/// Builds the full API router.
pub fn api_router(ctx: Arc<AppContext>) -> Router {
    let auth_state: middleware::AuthState = Arc::clone(&ctx.verifier);

    let authed = Router::new()
        .nest("/quizzes", quizzes::routes())
        .nest("/attempts", attempts::routes())
        .nest("/materials", materials::routes())
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .nest("/api", authed)
        .nest("/api/webhooks", webhooks::routes())
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

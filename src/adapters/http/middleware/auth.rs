//! Bearer-token authentication middleware and extractor.
//!
//! The middleware validates the Authorization header through the
//! `TokenVerifier` port and injects `CurrentUser` into request extensions.
//! A missing header passes through untouched; handlers that need identity
//! use the `CurrentUser` extractor, which rejects with 401. Verification
//! failures answer a generic unauthorized body, never the internal cause.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::domain::foundation::UserId;
use crate::ports::TokenVerifier;

/// Middleware state - the token verifier port.
pub type AuthState = Arc<dyn TokenVerifier>;

/// The authenticated user, injected into request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserId);

pub async fn auth_middleware(
    State(verifier): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match token {
        Some(token) => match verifier.verify(token).await {
            Ok(claims) => {
                request.extensions_mut().insert(CurrentUser(claims.user_id));
                next.run(request).await
            }
            Err(e) => {
                tracing::debug!(error = %e, "token verification failed");
                unauthorized()
            }
        },
        None => next.run(request).await,
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Unauthorized",
            "code": "UNAUTHORIZED"
        })),
    )
        .into_response()
}

#[async_trait::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(unauthorized)
    }
}

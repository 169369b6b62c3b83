//! DomainError to HTTP response mapping.
//!
//! 5xx-class failures get a generic body; the full error detail stays in the
//! logs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::foundation::{DomainError, ErrorCode};

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

/// Wrapper that renders a `DomainError` as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::QuizNotFound
        | ErrorCode::AttemptNotFound
        | ErrorCode::MaterialNotFound
        | ErrorCode::MessageNotFound
        | ErrorCode::SubscriptionNotFound => StatusCode::NOT_FOUND,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::QuotaExceeded | ErrorCode::StorageLimitExceeded => {
            StatusCode::TOO_MANY_REQUESTS
        }
        ErrorCode::LockTimeout | ErrorCode::InvalidTransition => StatusCode::CONFLICT,
        ErrorCode::UnexpectedOutputType
        | ErrorCode::GenerationFailed
        | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCode::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.code);
        let body = if status.is_server_error() {
            tracing::error!(code = %self.0.code, message = %self.0.message, "request failed");
            ErrorBody {
                error: "Internal error".to_string(),
                code: self.0.code.to_string(),
            }
        } else {
            ErrorBody {
                error: self.0.message,
                code: self.0.code.to_string(),
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_exceeded_maps_to_429() {
        assert_eq!(
            status_for(ErrorCode::QuotaExceeded),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_for(ErrorCode::StorageLimitExceeded),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn contention_maps_to_409() {
        assert_eq!(status_for(ErrorCode::LockTimeout), StatusCode::CONFLICT);
        assert_eq!(
            status_for(ErrorCode::InvalidTransition),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn server_errors_hide_detail() {
        let err = ApiError(DomainError::new(
            ErrorCode::UnexpectedOutputType,
            "model returned quiz payload for feedback call",
        ));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_variants_map_to_404() {
        assert_eq!(status_for(ErrorCode::QuizNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(ErrorCode::AttemptNotFound),
            StatusCode::NOT_FOUND
        );
    }
}

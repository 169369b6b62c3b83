//! TokenVerifier port - bearer token validation.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::UserId;

/// Claims extracted from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthClaims {
    /// The authenticated user.
    pub user_id: UserId,
}

/// Token verification errors.
///
/// Detail stays internal; the HTTP boundary renders all of these as a
/// generic unauthorized response.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token is expired")]
    Expired,
}

/// Port for verifying bearer tokens.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verifies a bearer token and returns its claims.
    async fn verify(&self, token: &str) -> Result<AuthClaims, AuthError>;
}

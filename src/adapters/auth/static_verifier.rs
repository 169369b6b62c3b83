//! Static token verifier for testing.
//!
//! Maps literal token strings to user ids.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::foundation::UserId;
use crate::ports::{AuthClaims, AuthError, TokenVerifier};

/// Token verifier with a fixed token table.
#[derive(Default, Clone)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, UserId>,
}

impl StaticTokenVerifier {
    /// Creates an empty verifier; every token is rejected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token for a user.
    pub fn with_token(mut self, token: impl Into<String>, user_id: UserId) -> Self {
        self.tokens.insert(token.into(), user_id);
        self
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<AuthClaims, AuthError> {
        self.tokens
            .get(token)
            .map(|user_id| AuthClaims {
                user_id: user_id.clone(),
            })
            .ok_or(AuthError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_token_verifies() {
        let user = UserId::new("u1").unwrap();
        let verifier = StaticTokenVerifier::new().with_token("tok-1", user.clone());
        let claims = verifier.verify("tok-1").await.unwrap();
        assert_eq!(claims.user_id, user);
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let verifier = StaticTokenVerifier::new();
        assert!(verifier.verify("tok-1").await.is_err());
    }
}

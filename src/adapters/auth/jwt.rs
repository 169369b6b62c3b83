//! HS256 JWT verifier for bearer tokens minted by the identity service.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::foundation::UserId;
use crate::ports::{AuthClaims, AuthError, TokenVerifier};

/// Verifier settings.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared HMAC secret.
    pub secret: SecretString,
    /// Expected token issuer.
    pub issuer: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: u64,
}

/// JWT token verifier.
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Creates a verifier from config.
    pub fn new(config: &JwtConfig) -> Self {
        let decoding_key = DecodingKey::from_secret(config.secret.expose_secret().as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        Self {
            decoding_key,
            validation,
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<AuthClaims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("token expired");
                    AuthError::Expired
                }
                ErrorKind::InvalidSignature => {
                    tracing::warn!("invalid token signature");
                    AuthError::InvalidSignature
                }
                _ => {
                    tracing::debug!("token validation failed: {}", e);
                    AuthError::Malformed
                }
            }
        })?;
        let user_id = UserId::new(data.claims.sub).map_err(|_| AuthError::Malformed)?;
        Ok(AuthClaims { user_id })
    }
}

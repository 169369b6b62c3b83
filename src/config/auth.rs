//! Authentication configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared HMAC secret for bearer tokens
    pub jwt_secret: String,

    /// Expected token issuer
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

impl AuthConfig {
    /// Validate auth configuration
    ///
    /// Short secrets are tolerated outside production so local setups can
    /// use throwaway values.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.jwt_secret.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__JWT_SECRET"));
        }
        if *environment == Environment::Production && self.jwt_secret.len() < 32 {
            return Err(ValidationError::AuthSecretTooShort);
        }
        Ok(())
    }
}

fn default_issuer() -> String {
    "quizforge".to_string()
}

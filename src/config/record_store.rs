//! Record store configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Record store connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RecordStoreConfig {
    /// Base URL of the record store REST API
    pub url: String,

    /// Service token for privileged access
    pub service_token: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl RecordStoreConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate record store configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(ValidationError::InvalidRecordStoreUrl);
        }
        if self.service_token.is_empty() {
            return Err(ValidationError::MissingRequired(
                "RECORD_STORE__SERVICE_TOKEN",
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn default_timeout() -> u64 {
    10
}

//! Search service configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Search service connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Base URL of the search service
    pub url: String,

    /// API key for index writes
    pub api_key: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl SearchConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate search configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(ValidationError::InvalidSearchUrl);
        }
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingRequired("SEARCH__API_KEY"));
        }
        Ok(())
    }
}

fn default_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_http_url_fails_validation() {
        let config = SearchConfig {
            url: "meilisearch:7700".to_string(),
            api_key: "key".to_string(),
            timeout_secs: 10,
        };
        assert!(config.validate().is_err());
    }
}

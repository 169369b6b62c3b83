//! Redis configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Redis configuration for the work queue and entity locks
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// List key the job queue lives under
    #[serde(default = "default_queue_key")]
    pub queue_key: String,

    /// Key prefix for entity locks
    #[serde(default = "default_lock_prefix")]
    pub lock_prefix: String,
}

impl RedisConfig {
    /// Validate Redis configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ValidationError::InvalidRedisUrl);
        }
        if self.queue_key.is_empty() {
            return Err(ValidationError::MissingRequired("REDIS__QUEUE_KEY"));
        }
        Ok(())
    }
}

fn default_queue_key() -> String {
    "quizforge:jobs".to_string()
}

fn default_lock_prefix() -> String {
    "lock:".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_tls_urls_pass() {
        for url in ["redis://localhost:6379", "rediss://cache.internal:6380"] {
            let config = RedisConfig {
                url: url.to_string(),
                queue_key: default_queue_key(),
                lock_prefix: default_lock_prefix(),
            };
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn http_url_fails_validation() {
        let config = RedisConfig {
            url: "http://localhost:6379".to_string(),
            queue_key: default_queue_key(),
            lock_prefix: default_lock_prefix(),
        };
        assert!(config.validate().is_err());
    }
}

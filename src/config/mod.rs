//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read with the `QUIZFORGE`
//! prefix and nested keys use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use quizforge::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod ai;
mod auth;
mod error;
mod jobs;
mod record_store;
mod redis;
mod search;
mod server;
mod storage;

pub use ai::AiConfig;
pub use auth::AuthConfig;
pub use error::{ConfigError, ValidationError};
pub use jobs::JobsConfig;
pub use record_store::RecordStoreConfig;
pub use redis::RedisConfig;
pub use search::SearchConfig;
pub use server::{Environment, ServerConfig};
pub use storage::StorageConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Record store configuration (document database API)
    pub record_store: RecordStoreConfig,

    /// Search service configuration (quiz catalog index)
    pub search: SearchConfig,

    /// Redis configuration (work queue, entity locks)
    pub redis: RedisConfig,

    /// AI provider configuration (OpenAI-compatible endpoint)
    pub ai: AiConfig,

    /// Authentication configuration (bearer token verification)
    pub auth: AuthConfig,

    /// Background worker configuration
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Object storage configuration (uploaded materials)
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads a `.env` file if present, then reads environment variables
    /// with the `QUIZFORGE` prefix. Nested values use `__` as separator:
    ///
    /// - `QUIZFORGE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `QUIZFORGE__RECORD_STORE__URL=...` -> `record_store.url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("QUIZFORGE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.record_store.validate()?;
        self.search.validate()?;
        self.redis.validate()?;
        self.ai.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.jobs.validate()?;
        self.storage.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global, so these tests must not overlap.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("QUIZFORGE__RECORD_STORE__URL", "http://127.0.0.1:8090");
        env::set_var("QUIZFORGE__RECORD_STORE__SERVICE_TOKEN", "svc-token");
        env::set_var("QUIZFORGE__SEARCH__URL", "http://127.0.0.1:7700");
        env::set_var("QUIZFORGE__SEARCH__API_KEY", "masterKey");
        env::set_var("QUIZFORGE__REDIS__URL", "redis://localhost:6379");
        env::set_var("QUIZFORGE__AI__API_KEY", "sk-test");
        env::set_var("QUIZFORGE__AUTH__JWT_SECRET", "local-development-secret");
    }

    fn clear_env() {
        env::remove_var("QUIZFORGE__RECORD_STORE__URL");
        env::remove_var("QUIZFORGE__RECORD_STORE__SERVICE_TOKEN");
        env::remove_var("QUIZFORGE__SEARCH__URL");
        env::remove_var("QUIZFORGE__SEARCH__API_KEY");
        env::remove_var("QUIZFORGE__REDIS__URL");
        env::remove_var("QUIZFORGE__AI__API_KEY");
        env::remove_var("QUIZFORGE__AUTH__JWT_SECRET");
        env::remove_var("QUIZFORGE__SERVER__PORT");
        env::remove_var("QUIZFORGE__SERVER__ENVIRONMENT");
    }

    #[test]
    fn loads_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.record_store.url, "http://127.0.0.1:8090");
        assert_eq!(config.redis.url, "redis://localhost:6379");
    }

    #[test]
    fn minimal_env_passes_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn server_section_defaults_when_absent() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.jobs.worker_count, 4);
    }

    #[test]
    fn environment_override_is_applied() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("QUIZFORGE__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
    }
}

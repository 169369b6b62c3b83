//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid record store URL format")]
    InvalidRecordStoreUrl,

    #[error("Invalid search service URL format")]
    InvalidSearchUrl,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Worker count must be at least 1")]
    InvalidWorkerCount,

    #[error("Lock wait timeout must exceed the poll interval")]
    InvalidLockTimings,

    #[error("Auth secret must be at least 32 bytes in production")]
    AuthSecretTooShort,
}

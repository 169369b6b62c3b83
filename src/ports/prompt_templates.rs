//! PromptTemplates port - versioned named instruction templates.
//!
//! Templates are looked up by name and environment label and substituted
//! with named parameters. The store's own I/O and caching live behind this
//! interface; assembly only consumes the resolved text.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Template store errors.
#[derive(Debug, Clone, Error)]
pub enum TemplateError {
    #[error("template not found: {name} (label {label})")]
    NotFound { name: String, label: String },

    #[error("missing parameter '{param}' for template '{name}'")]
    MissingParameter { name: String, param: String },

    #[error("template store unavailable: {0}")]
    Unavailable(String),
}

/// Port for the versioned prompt template store.
#[async_trait]
pub trait PromptTemplates: Send + Sync {
    /// Resolves a template by name and environment label, substituting
    /// `{param}` placeholders from `params`.
    async fn resolve(
        &self,
        name: &str,
        label: &str,
        params: &HashMap<String, String>,
    ) -> Result<String, TemplateError>;
}

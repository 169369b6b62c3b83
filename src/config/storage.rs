//! Object storage configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Object storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory uploaded materials are written under
    #[serde(default = "default_root")]
    pub root: String,
}

impl StorageConfig {
    /// Validate storage configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.root.is_empty() {
            return Err(ValidationError::MissingRequired("STORAGE__ROOT"));
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

fn default_root() -> String {
    "data/materials".to_string()
}

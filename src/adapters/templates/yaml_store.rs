//! YAML-file prompt template store.
//!
//! Templates live in one YAML file, keyed by name. Each name maps
//! environment labels (`production`, `latest`, ...) to versioned template
//! bodies with `{param}` placeholders. The file is parsed once at startup;
//! edits require a restart.
//!
//! ```yaml
//! quiz_generation:
//!   production:
//!     version: 3
//!     text: |
//!       You are a quiz author. Write {item_count} questions...
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::ports::{PromptTemplates, TemplateError};

#[derive(Debug, Clone, Deserialize)]
struct TemplateVersion {
    #[allow(dead_code)]
    #[serde(default)]
    version: u32,
    text: String,
}

type TemplateFile = HashMap<String, HashMap<String, TemplateVersion>>;

/// Template store backed by a YAML file loaded at startup.
pub struct YamlTemplateStore {
    templates: TemplateFile,
}

impl YamlTemplateStore {
    /// Loads and parses the template file.
    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| TemplateError::Unavailable(format!("{}: {}", path.display(), e)))?;
        Self::from_str(&raw)
    }

    /// Parses templates from a YAML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(raw: &str) -> Result<Self, TemplateError> {
        let templates: TemplateFile =
            serde_yaml::from_str(raw).map_err(|e| TemplateError::Unavailable(e.to_string()))?;
        Ok(Self { templates })
    }

    /// Substitutes `{param}` placeholders; any placeholder without a value
    /// is an error.
    fn substitute(
        name: &str,
        text: &str,
        params: &HashMap<String, String>,
    ) -> Result<String, TemplateError> {
        let mut resolved = text.to_string();
        for (key, value) in params {
            resolved = resolved.replace(&format!("{{{}}}", key), value);
        }
        if let Some(start) = resolved.find('{') {
            let rest = &resolved[start + 1..];
            if let Some(end) = rest.find('}') {
                let param = &rest[..end];
                if !param.is_empty() && param.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    return Err(TemplateError::MissingParameter {
                        name: name.to_string(),
                        param: param.to_string(),
                    });
                }
            }
        }
        Ok(resolved)
    }
}

#[async_trait]
impl PromptTemplates for YamlTemplateStore {
    async fn resolve(
        &self,
        name: &str,
        label: &str,
        params: &HashMap<String, String>,
    ) -> Result<String, TemplateError> {
        let version = self
            .templates
            .get(name)
            .and_then(|labels| labels.get(label))
            .ok_or_else(|| TemplateError::NotFound {
                name: name.to_string(),
                label: label.to_string(),
            })?;
        Self::substitute(name, &version.text, params)
    }
}

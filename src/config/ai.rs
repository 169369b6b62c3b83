//! AI provider configuration

use serde::Deserialize;
use std::time::Duration;

use crate::domain::generation::ModelRates;

use super::error::ValidationError;

/// AI provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// API key for the chat-completions endpoint
    pub api_key: String,

    /// Model to request
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Path to the prompt template YAML file
    #[serde(default = "default_template_path")]
    pub template_path: String,

    /// Template environment label to resolve (`production`, `latest`, ...)
    #[serde(default = "default_template_label")]
    pub template_label: String,

    /// Maximum output tokens per call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Dollar price per million non-cached input tokens
    #[serde(default = "default_input_rate")]
    pub input_rate_per_million: f64,

    /// Dollar price per million cache-read input tokens
    #[serde(default = "default_cached_input_rate")]
    pub cached_input_rate_per_million: f64,

    /// Dollar price per million output tokens
    #[serde(default = "default_output_rate")]
    pub output_rate_per_million: f64,
}

impl AiConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Billing rates for the configured model
    pub fn rates(&self) -> ModelRates {
        ModelRates::per_million(
            self.input_rate_per_million,
            self.cached_input_rate_per_million,
            self.output_rate_per_million,
        )
    }

    /// Validate AI configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingRequired("AI__API_KEY"));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.template_path.is_empty() {
            return Err(ValidationError::MissingRequired("AI__TEMPLATE_PATH"));
        }
        Ok(())
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_template_path() -> String {
    "templates/prompts.yaml".to_string()
}

fn default_template_label() -> String {
    "production".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.2
}

fn default_input_rate() -> f64 {
    3.0
}

fn default_cached_input_rate() -> f64 {
    0.3
}

fn default_output_rate() -> f64 {
    15.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> AiConfig {
        AiConfig {
            api_key: "sk-test".to_string(),
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            template_path: default_template_path(),
            template_label: default_template_label(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            input_rate_per_million: default_input_rate(),
            cached_input_rate_per_million: default_cached_input_rate(),
            output_rate_per_million: default_output_rate(),
        }
    }

    #[test]
    fn empty_api_key_fails_validation() {
        let config = AiConfig {
            api_key: String::new(),
            ..base()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rates_scale_down_to_per_token() {
        let rates = base().rates();
        assert!((rates.input - 3.0 / 1_000_000.0).abs() < f64::EPSILON);
    }
}

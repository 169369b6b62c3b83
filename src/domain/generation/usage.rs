//! Token usage and cost accounting.

use serde::{Deserialize, Serialize};

/// Token usage for one generation call.
///
/// Cache-read tokens are prompt tokens served from the provider's prompt
/// cache; they bill at a discounted rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub input_tokens: u32,
    /// Prompt tokens served from the provider-side cache.
    pub cache_read_tokens: u32,
    /// Tokens generated.
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Creates new token usage.
    pub fn new(input_tokens: u32, cache_read_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            cache_read_tokens,
            output_tokens,
        }
    }

    /// Creates zero usage.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Total billed tokens.
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    /// Accumulates usage across multiple calls or stream chunks.
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.cache_read_tokens += other.cache_read_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Per-model dollar rates per token.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelRates {
    /// Rate for non-cached input tokens.
    pub input: f64,
    /// Rate for cache-read input tokens.
    pub cached_input: f64,
    /// Rate for output tokens.
    pub output: f64,
}

impl ModelRates {
    /// Rates per single token, given per-million-token prices in dollars.
    pub fn per_million(input: f64, cached_input: f64, output: f64) -> Self {
        Self {
            input: input / 1_000_000.0,
            cached_input: cached_input / 1_000_000.0,
            output: output / 1_000_000.0,
        }
    }

    /// Dollar cost of a call, rounded to six decimal places for logging.
    ///
    /// `cost = (input - cache_read) * rate_in + cache_read * rate_cached
    ///        + output * rate_out`
    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        let non_cached = usage.input_tokens.saturating_sub(usage.cache_read_tokens);
        let raw = non_cached as f64 * self.input
            + usage.cache_read_tokens as f64 * self.cached_input
            + usage.output_tokens as f64 * self.output;
        (raw * 1_000_000.0).round() / 1_000_000.0
    }
}

//! AiProvider port - interface for LLM provider integrations.
//!
//! Abstracts the model vendor behind completion and streaming calls over
//! assembled prompt segments. The provider receives the prompt cache key so
//! replayed prompts can hit the vendor-side cache.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

use crate::domain::foundation::UserId;
use crate::domain::generation::TokenUsage;
use crate::domain::prompt::PromptSegment;

/// Request for one model call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Assembled prompt segments, in order.
    pub segments: Vec<PromptSegment>,
    /// Provider-side prompt cache key; stable across retries.
    pub cache_key: String,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Tracing and billing metadata.
    pub metadata: RequestMetadata,
}

/// Request metadata for tracing and billing.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// User the call is billed to.
    pub user_id: UserId,
    /// Correlation key (attempt or quiz cache key).
    pub session_key: String,
}

/// Response from a non-streaming model call.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Raw generated text; callers parse it against their expected schema.
    pub content: String,
    /// Token usage for the call.
    pub usage: TokenUsage,
    /// Model that produced the response.
    pub model: String,
}

/// Incremental piece of a streaming response.
#[derive(Debug, Clone)]
pub struct StreamChunk {
    /// New text in this chunk.
    pub delta: String,
    /// Usage totals, present only on the final chunk.
    pub usage: Option<TokenUsage>,
}

impl StreamChunk {
    /// Creates a content chunk.
    pub fn content(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
            usage: None,
        }
    }

    /// Creates the final chunk carrying usage totals.
    pub fn final_chunk(usage: TokenUsage) -> Self {
        Self {
            delta: String::new(),
            usage: Some(usage),
        }
    }

    /// True when this chunk terminates the stream.
    pub fn is_final(&self) -> bool {
        self.usage.is_some()
    }
}

/// Boxed stream of incremental chunks.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, AiError>> + Send>>;

/// AI provider errors.
#[derive(Debug, Error)]
pub enum AiError {
    /// Rate limited by the provider.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u32 },

    /// Provider is unavailable or returned a server error.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// API key or authentication failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Network error during request.
    #[error("network error: {0}")]
    Network(String),

    /// Failed to parse the provider response envelope.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid request configuration.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Request timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u32 },
}

impl AiError {
    /// True when a retry of the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AiError::RateLimited { .. }
                | AiError::Unavailable(_)
                | AiError::Network(_)
                | AiError::Timeout { .. }
        )
    }
}

/// Port for LLM provider interactions.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Executes one completion and returns the full response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AiError>;

    /// Executes one completion as a stream of text deltas.
    ///
    /// The final chunk carries usage totals; dropping the stream cancels
    /// the underlying request.
    async fn stream_complete(&self, request: CompletionRequest) -> Result<DeltaStream, AiError>;
}

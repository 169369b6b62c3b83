//! OpenAI-compatible provider adapter.
//!
//! Sends assembled prompt segments to a chat-completions endpoint and maps
//! the response envelope back to the port types. The prompt cache key rides
//! along as `prompt_cache_key` so replayed prompts hit the vendor-side
//! prompt cache; cached prompt tokens come back under
//! `prompt_tokens_details.cached_tokens` and feed the discounted cost path.
//!
//! Retries live in the caller (the agent runner replays the same assembled
//! prompt), so this adapter performs exactly one request per call.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::generation::TokenUsage;
use crate::domain::prompt::SegmentRole;
use crate::ports::{
    AiError, AiProvider, CompletionRequest, CompletionResponse, DeltaStream, StreamChunk,
};

/// Configuration for the OpenAI-compatible provider.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    api_key: SecretString,
    /// Model to request.
    pub model: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Creates a configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// OpenAI-compatible chat-completions provider.
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiProvider {
    /// Creates a provider with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AiError::Network(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn to_wire_request(&self, request: &CompletionRequest, stream: bool) -> WireRequest {
        let messages = request
            .segments
            .iter()
            .map(|segment| WireMessage {
                role: match segment.role {
                    SegmentRole::System => "system",
                    SegmentRole::User => "user",
                    SegmentRole::Assistant => "assistant",
                }
                .to_string(),
                content: segment.text.clone(),
            })
            .collect();

        WireRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            prompt_cache_key: Some(request.cache_key.clone()),
            user: Some(request.metadata.user_id.to_string()),
            stream: Some(stream),
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
        }
    }

    async fn send(&self, request: &CompletionRequest, stream: bool) -> Result<Response, AiError> {
        let wire = self.to_wire_request(request, stream);
        self.client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .header("Content-Type", "application/json")
            .json(&wire)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AiError::Timeout {
                        timeout_secs: self.config.timeout.as_secs() as u32,
                    }
                } else {
                    AiError::Network(e.to_string())
                }
            })
    }

    async fn check_status(response: Response) -> Result<Response, AiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 | 403 => Err(AiError::AuthenticationFailed),
            429 => Err(AiError::RateLimited {
                retry_after_secs: parse_retry_after(&body),
            }),
            400..=499 => Err(AiError::InvalidRequest(body)),
            _ => Err(AiError::Unavailable(format!("{}: {}", status, body))),
        }
    }
}

/// Pulls a "try again in Ns" hint out of a rate-limit error body.
fn parse_retry_after(body: &str) -> u32 {
    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = parsed
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            if let Some(idx) = message.find("try again in ") {
                let rest = &message[idx + 13..];
                let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                if let Ok(secs) = digits.parse::<u32>() {
                    return secs;
                }
            }
        }
    }
    30
}

fn usage_from_wire(usage: Option<WireUsage>) -> TokenUsage {
    usage
        .map(|u| {
            TokenUsage::new(
                u.prompt_tokens,
                u.prompt_tokens_details
                    .map(|d| d.cached_tokens)
                    .unwrap_or_default(),
                u.completion_tokens,
            )
        })
        .unwrap_or_default()
}

fn parse_sse_chunks(text: &str) -> Vec<Result<StreamChunk, AiError>> {
    let mut results = Vec::new();
    for line in text.lines() {
        let Some(data) = line.strip_prefix("data: ") else {
            continue;
        };
        if data == "[DONE]" {
            continue;
        }
        match serde_json::from_str::<WireStreamChunk>(data) {
            Ok(chunk) => {
                if let Some(choice) = chunk.choices.first() {
                    if let Some(ref content) = choice.delta.content {
                        if !content.is_empty() {
                            results.push(Ok(StreamChunk::content(content)));
                        }
                    }
                }
                // Usage arrives in a trailing chunk with no choices.
                if let Some(usage) = chunk.usage {
                    results.push(Ok(StreamChunk::final_chunk(usage_from_wire(Some(usage)))));
                }
            }
            Err(e) => {
                if !data.trim().is_empty() {
                    results.push(Err(AiError::Parse(format!("bad SSE chunk: {}", e))));
                }
            }
        }
    }
    results
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AiError> {
        let response = self.send(&request, false).await?;
        let response = Self::check_status(response).await?;

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;

        let choice = wire
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AiError::Parse("no choices in response".to_string()))?;

        Ok(CompletionResponse {
            content: choice.message.content,
            usage: usage_from_wire(wire.usage),
            model: wire.model,
        })
    }

    async fn stream_complete(&self, request: CompletionRequest) -> Result<DeltaStream, AiError> {
        let response = self.send(&request, true).await?;
        let response = Self::check_status(response).await?;

        let stream = response
            .bytes_stream()
            .map(|chunk_result| match chunk_result {
                Ok(bytes) => parse_sse_chunks(&String::from_utf8_lossy(&bytes)),
                Err(e) => vec![Err(AiError::Network(e.to_string()))],
            })
            .flat_map(stream::iter);

        Ok(Box::pin(stream))
    }
}

// ----- Wire types -----

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt_cache_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    model: String,
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    prompt_tokens_details: Option<WirePromptDetails>,
}

#[derive(Debug, Deserialize)]
struct WirePromptDetails {
    #[serde(default)]
    cached_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireStreamChunk {
    choices: Vec<WireStreamChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireStreamChoice {
    delta: WireDelta,
}

#[derive(Debug, Deserialize)]
struct WireDelta {
    content: Option<String>,
}

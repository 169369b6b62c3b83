//! Scriptable AI provider for testing.
//!
//! Responses are queued ahead of time and handed out in order; every request
//! is recorded so tests can assert on call counts, cache keys, and the exact
//! segments sent on retries.

use async_trait::async_trait;
use futures::stream;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::generation::TokenUsage;
use crate::ports::{
    AiError, AiProvider, CompletionRequest, CompletionResponse, DeltaStream, StreamChunk,
};

/// One scripted outcome.
enum Scripted {
    Reply { content: String, usage: TokenUsage },
    Failure(AiError),
}

/// Scriptable mock provider.
#[derive(Clone, Default)]
pub struct MockAiProvider {
    script: Arc<Mutex<Vec<Scripted>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockAiProvider {
    /// Creates a provider with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful reply.
    pub async fn push_reply(&self, content: impl Into<String>, usage: TokenUsage) {
        self.script.lock().await.push(Scripted::Reply {
            content: content.into(),
            usage,
        });
    }

    /// Queues a failure.
    pub async fn push_failure(&self, error: AiError) {
        self.script.lock().await.push(Scripted::Failure(error));
    }

    /// Requests received so far, in call order.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of calls made.
    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    async fn next(&self, request: CompletionRequest) -> Result<(String, TokenUsage), AiError> {
        self.requests.lock().await.push(request);
        let mut script = self.script.lock().await;
        if script.is_empty() {
            return Err(AiError::Unavailable("mock script exhausted".to_string()));
        }
        match script.remove(0) {
            Scripted::Reply { content, usage } => Ok((content, usage)),
            Scripted::Failure(error) => Err(error),
        }
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AiError> {
        let (content, usage) = self.next(request).await?;
        Ok(CompletionResponse {
            content,
            usage,
            model: "mock".to_string(),
        })
    }

    async fn stream_complete(&self, request: CompletionRequest) -> Result<DeltaStream, AiError> {
        let (content, usage) = self.next(request).await?;
        // Split on whitespace boundaries to exercise multi-chunk consumers.
        let mut chunks: Vec<Result<StreamChunk, AiError>> = content
            .split_inclusive(' ')
            .map(|piece| Ok(StreamChunk::content(piece)))
            .collect();
        chunks.push(Ok(StreamChunk::final_chunk(usage)));
        Ok(Box::pin(stream::iter(chunks)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use crate::domain::prompt::PromptSegment;
    use crate::ports::RequestMetadata;
    use futures::StreamExt;

    fn request(cache_key: &str) -> CompletionRequest {
        CompletionRequest {
            segments: vec![PromptSegment::user("hi")],
            cache_key: cache_key.to_string(),
            max_tokens: None,
            temperature: None,
            metadata: RequestMetadata {
                user_id: UserId::new("u1").unwrap(),
                session_key: cache_key.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn scripted_replies_come_out_in_order() {
        let provider = MockAiProvider::new();
        provider.push_reply("first", TokenUsage::new(1, 0, 1)).await;
        provider.push_reply("second", TokenUsage::new(2, 0, 2)).await;

        let a = provider.complete(request("k")).await.unwrap();
        let b = provider.complete(request("k")).await.unwrap();
        assert_eq!(a.content, "first");
        assert_eq!(b.content, "second");
        assert_eq!(provider.call_count().await, 2);
    }

    #[tokio::test]
    async fn exhausted_script_fails() {
        let provider = MockAiProvider::new();
        let err = provider.complete(request("k")).await.unwrap_err();
        assert!(matches!(err, AiError::Unavailable(_)));
    }

    #[tokio::test]
    async fn requests_are_recorded_with_cache_keys() {
        let provider = MockAiProvider::new();
        provider.push_reply("r", TokenUsage::zero()).await;
        provider.complete(request("attempt-a1")).await.unwrap();

        let seen = provider.requests().await;
        assert_eq!(seen[0].cache_key, "attempt-a1");
    }

    #[tokio::test]
    async fn stream_ends_with_usage_chunk() {
        let provider = MockAiProvider::new();
        provider
            .push_reply("hello streaming world", TokenUsage::new(5, 0, 3))
            .await;

        let mut stream = provider.stream_complete(request("k")).await.unwrap();
        let mut text = String::new();
        let mut final_usage = None;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            if chunk.is_final() {
                final_usage = chunk.usage;
            } else {
                text.push_str(&chunk.delta);
            }
        }
        assert_eq!(text, "hello streaming world");
        assert_eq!(final_usage, Some(TokenUsage::new(5, 0, 3)));
    }
}

//! Streaming bridge - provider deltas to SSE events with guaranteed
//! finalization.
//!
//! A producer task consumes the provider's delta stream and forwards chunks
//! into a bounded channel the SSE handler drains. Whatever way the producer
//! exits (stream end, provider error, client disconnect closing the
//! channel), a single finalize step persists the accumulated content as the
//! message's terminal state, so a message can never stay `streaming`. The
//! message charge lands only after the provider stream ran to completion.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::attempt::{Message, MessageMetadata};
use crate::domain::billing::UsageCounter;
use crate::domain::foundation::{AttemptId, DomainError, UserId};
use crate::domain::generation::TokenUsage;
use crate::ports::{DeltaStream, Patch, Record, RecordStore};

use super::collections;
use super::quota::QuotaLedger;

/// One SSE `chunk` event.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StreamEvent {
    /// New text in this chunk.
    pub text: String,
    /// Message the chunk belongs to.
    pub msg_id: String,
    /// Zero-based chunk index.
    pub i: u64,
}

/// Handle to one in-flight streamed reply.
pub struct StreamSession {
    /// Store id of the streaming message.
    pub message_id: String,
    /// Chunk events for the SSE response.
    pub events: mpsc::Receiver<StreamEvent>,
    /// Resolves once the message has been finalized.
    pub finished: JoinHandle<()>,
}

/// Bridges provider delta streams into persisted messages and SSE events.
#[derive(Clone)]
pub struct StreamingBridge {
    store: Arc<dyn RecordStore>,
    ledger: QuotaLedger,
    buffer: usize,
}

impl StreamingBridge {
    /// Creates a bridge with the given channel capacity.
    pub fn new(store: Arc<dyn RecordStore>, ledger: QuotaLedger, buffer: usize) -> Self {
        Self {
            store,
            ledger,
            buffer,
        }
    }

    /// Persists a fresh AI message, moves it to `streaming`, and spawns the
    /// producer task over `stream`.
    pub async fn start(
        &self,
        user_id: &UserId,
        attempt_id: &AttemptId,
        stream: DeltaStream,
    ) -> Result<StreamSession, DomainError> {
        let mut message = Message::ai_initial(attempt_id.clone());
        message.to_streaming()?;

        let fields = Record::fields_from(&message)
            .map_err(|e| DomainError::upstream(e.to_string()))?;
        let record = self
            .store
            .create(collections::MESSAGES, fields)
            .await
            .map_err(|e| DomainError::upstream(e.to_string()))?;
        let message_id = record.id;

        let (sender, events) = mpsc::channel(self.buffer);
        let store = Arc::clone(&self.store);
        let ledger = self.ledger.clone();
        let user_id = user_id.clone();
        let producer_msg_id = message_id.clone();

        let finished = tokio::spawn(async move {
            let outcome = pump(stream, sender, &producer_msg_id).await;
            finalize(&store, &ledger, &user_id, &producer_msg_id, outcome).await;
        });

        Ok(StreamSession {
            message_id,
            events,
            finished,
        })
    }
}

struct PumpOutcome {
    content: String,
    usage: Option<TokenUsage>,
    completed: bool,
}

/// Forwards deltas until the stream ends, errors, or the consumer goes away.
async fn pump(
    mut stream: DeltaStream,
    sender: mpsc::Sender<StreamEvent>,
    msg_id: &str,
) -> PumpOutcome {
    let mut content = String::new();
    let mut usage = None;
    let mut completed = false;
    let mut index = 0u64;

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(chunk) if chunk.is_final() => {
                usage = chunk.usage;
                completed = true;
                break;
            }
            Ok(chunk) => {
                content.push_str(&chunk.delta);
                let event = StreamEvent {
                    text: chunk.delta,
                    msg_id: msg_id.to_string(),
                    i: index,
                };
                index += 1;
                if sender.send(event).await.is_err() {
                    // Consumer disconnected; dropping the stream cancels the
                    // provider request.
                    tracing::debug!(msg_id, "stream consumer disconnected");
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(msg_id, error = %e, "provider stream failed mid-flight");
                break;
            }
        }
    }

    PumpOutcome {
        content,
        usage,
        completed,
    }
}

/// Persists the terminal message state and charges on completion. Runs on
/// every producer exit path.
async fn finalize(
    store: &Arc<dyn RecordStore>,
    ledger: &QuotaLedger,
    user_id: &UserId,
    msg_id: &str,
    outcome: PumpOutcome,
) {
    let mut message = match store.get(collections::MESSAGES, msg_id).await {
        Ok(record) => match record.deserialize::<Message>() {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(msg_id, error = %e, "cannot deserialize streaming message");
                return;
            }
        },
        Err(e) => {
            tracing::error!(msg_id, error = %e, "cannot load streaming message to finalize");
            return;
        }
    };

    message.to_final(outcome.content, MessageMetadata::default());
    let patches = vec![
        Patch::set("status", serde_json::json!(message.status)),
        Patch::set("content", message.content.clone()),
        Patch::set("metadata", serde_json::json!(message.metadata)),
    ];
    if let Err(e) = store.update(collections::MESSAGES, msg_id, patches).await {
        tracing::error!(msg_id, error = %e, "failed to persist final message state");
    }

    if outcome.completed {
        if let Some(usage) = outcome.usage {
            tracing::debug!(
                msg_id,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "stream completed"
            );
        }
        if let Err(e) = ledger.charge(user_id, UsageCounter::Messages, 1).await {
            tracing::error!(msg_id, error = %e, "failed to charge completed stream");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::record_store::InMemoryRecordStore;
    use crate::domain::attempt::MessageStatus;
    use crate::ports::{AiError, StreamChunk};
    use futures::stream;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn attempt_id() -> AttemptId {
        AttemptId::new("attempt-1").unwrap()
    }

    fn delta_stream(chunks: Vec<Result<StreamChunk, AiError>>) -> DeltaStream {
        Box::pin(stream::iter(chunks))
    }

    async fn bridge() -> (Arc<InMemoryRecordStore>, StreamingBridge) {
        let store = Arc::new(InMemoryRecordStore::new());
        let ledger = QuotaLedger::new(store.clone());
        let bridge = StreamingBridge::new(store.clone(), ledger, 16);
        (store, bridge)
    }

    async fn load_message(store: &InMemoryRecordStore, id: &str) -> Message {
        store
            .get(collections::MESSAGES, id)
            .await
            .unwrap()
            .deserialize()
            .unwrap()
    }

    #[tokio::test]
    async fn completed_stream_finalizes_and_charges() {
        let (store, bridge) = bridge().await;
        let stream = delta_stream(vec![
            Ok(StreamChunk::content("Hel")),
            Ok(StreamChunk::content("lo")),
            Ok(StreamChunk::final_chunk(TokenUsage::new(10, 0, 2))),
        ]);

        let mut session = bridge.start(&user(), &attempt_id(), stream).await.unwrap();

        let mut events = Vec::new();
        while let Some(event) = session.events.recv().await {
            events.push(event);
        }
        session.finished.await.unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].text, "Hel");
        assert_eq!(events[0].i, 0);
        assert_eq!(events[1].i, 1);
        assert_eq!(events[0].msg_id, session.message_id);

        let message = load_message(&store, &session.message_id).await;
        assert_eq!(message.status, MessageStatus::Final);
        assert_eq!(message.content, "Hello");

        let subscription = QuotaLedger::new(store.clone())
            .subscription(&user())
            .await
            .unwrap();
        assert_eq!(subscription.messages_usage, 1);
    }

    #[tokio::test]
    async fn provider_error_still_finalizes_with_partial_content() {
        let (store, bridge) = bridge().await;
        let stream = delta_stream(vec![
            Ok(StreamChunk::content("partial")),
            Err(AiError::Network("reset".into())),
        ]);

        let mut session = bridge.start(&user(), &attempt_id(), stream).await.unwrap();
        while session.events.recv().await.is_some() {}
        session.finished.await.unwrap();

        let message = load_message(&store, &session.message_id).await;
        assert_eq!(message.status, MessageStatus::Final);
        assert_eq!(message.content, "partial");

        // Incomplete stream: no message charge.
        let subscription = QuotaLedger::new(store.clone())
            .subscription(&user())
            .await
            .unwrap();
        assert_eq!(subscription.messages_usage, 0);
    }

    #[tokio::test]
    async fn client_disconnect_never_leaves_message_streaming() {
        let (store, bridge) = bridge().await;
        let chunks: Vec<Result<StreamChunk, AiError>> = (0..100)
            .map(|n| Ok(StreamChunk::content(format!("c{} ", n))))
            .collect();
        let stream = delta_stream(chunks);

        let mut session = bridge.start(&user(), &attempt_id(), stream).await.unwrap();
        // Read one chunk, then hang up.
        let first = session.events.recv().await.unwrap();
        assert_eq!(first.i, 0);
        drop(session.events);
        session.finished.await.unwrap();

        let message = load_message(&store, &session.message_id).await;
        assert_eq!(message.status, MessageStatus::Final);
        assert!(message.content.starts_with("c0"));
    }
}

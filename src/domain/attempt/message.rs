//! Message entity and its streaming lifecycle.
//!
//! A message moves `initial -> streaming -> final`. Only AI messages stream;
//! user messages are created already carrying their content and go straight
//! to final. Once final, a message is immutable.

use crate::domain::foundation::{AttemptId, DomainError, ErrorCode, MessageId, Timestamp};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Ai,
}

/// Streaming lifecycle status of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Created, no content streamed yet.
    Initial,
    /// Partial AI content is being streamed.
    Streaming,
    /// Terminal; content and metadata are frozen.
    Final,
}

/// Tool-call metadata attached to a message.
///
/// `tool_calls` and `tool_results` only ever grow: finalization appends,
/// it never replaces what an earlier transition recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default)]
    pub tool_calls: Vec<String>,
    #[serde(default)]
    pub tool_results: Vec<String>,
    /// Quiz item this message is explaining, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
}

impl MessageMetadata {
    /// Merges another metadata blob into this one.
    ///
    /// Lists are appended (union, not overwrite); `item_id` is only set
    /// when absent.
    pub fn merge(&mut self, other: MessageMetadata) {
        self.tool_calls.extend(other.tool_calls);
        self.tool_results.extend(other.tool_results);
        if self.item_id.is_none() {
            self.item_id = other.item_id;
        }
    }
}

/// One turn in a quiz-attempt conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub attempt_id: AttemptId,
    pub role: MessageRole,
    pub status: MessageStatus,
    pub content: String,
    pub metadata: MessageMetadata,
    pub created_at: Timestamp,
}

impl Message {
    /// Creates a user message; user content arrives complete, so the message
    /// is final immediately.
    pub fn user(attempt_id: AttemptId, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            attempt_id,
            role: MessageRole::User,
            status: MessageStatus::Final,
            content: content.into(),
            metadata: MessageMetadata::default(),
            created_at: Timestamp::now(),
        }
    }

    /// Creates an empty AI message awaiting streamed content.
    pub fn ai_initial(attempt_id: AttemptId) -> Self {
        Self {
            id: MessageId::generate(),
            attempt_id,
            role: MessageRole::Ai,
            status: MessageStatus::Initial,
            content: String::new(),
            metadata: MessageMetadata::default(),
            created_at: Timestamp::now(),
        }
    }

    /// Transitions the message into the streaming state.
    ///
    /// Legal only from `initial` and only for AI messages; user messages
    /// never stream.
    pub fn to_streaming(&mut self) -> Result<(), DomainError> {
        if self.role != MessageRole::Ai {
            return Err(DomainError::new(
                ErrorCode::InvalidTransition,
                "only AI messages can stream",
            ));
        }
        if self.status != MessageStatus::Initial {
            return Err(DomainError::new(
                ErrorCode::InvalidTransition,
                format!("cannot start streaming from {:?}", self.status),
            ));
        }
        self.status = MessageStatus::Streaming;
        Ok(())
    }

    /// Finalizes the message with its terminal content.
    ///
    /// Callable from any state and safe to repeat: duplicate job deliveries
    /// and cancelled-then-retried streams re-finalize. Metadata is merged
    /// (tool calls and results appended, never replaced); content is
    /// overwritten with the latest argument.
    pub fn to_final(&mut self, content: impl Into<String>, metadata: MessageMetadata) {
        self.content = content.into();
        self.metadata.merge(metadata);
        self.status = MessageStatus::Final;
    }

    /// True once the message has reached its terminal state.
    pub fn is_final(&self) -> bool {
        self.status == MessageStatus::Final
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt_id() -> AttemptId {
        AttemptId::new("attempt-1").unwrap()
    }

    #[test]
    fn user_messages_are_final_on_creation() {
        let msg = Message::user(attempt_id(), "why is b correct?");
        assert_eq!(msg.status, MessageStatus::Final);
        assert_eq!(msg.role, MessageRole::User);
    }

    #[test]
    fn ai_message_streams_from_initial() {
        let mut msg = Message::ai_initial(attempt_id());
        msg.to_streaming().unwrap();
        assert_eq!(msg.status, MessageStatus::Streaming);
    }

    #[test]
    fn streaming_twice_is_invalid() {
        let mut msg = Message::ai_initial(attempt_id());
        msg.to_streaming().unwrap();
        let err = msg.to_streaming().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
    }

    #[test]
    fn user_messages_never_stream() {
        let mut msg = Message::user(attempt_id(), "hi");
        let err = msg.to_streaming().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
    }

    #[test]
    fn to_final_works_from_initial_and_streaming() {
        let mut from_initial = Message::ai_initial(attempt_id());
        from_initial.to_final("done", MessageMetadata::default());
        assert_eq!(from_initial.status, MessageStatus::Final);
        assert_eq!(from_initial.content, "done");

        let mut from_streaming = Message::ai_initial(attempt_id());
        from_streaming.to_streaming().unwrap();
        from_streaming.to_final("partial", MessageMetadata::default());
        assert_eq!(from_streaming.status, MessageStatus::Final);
    }

    #[test]
    fn finalizing_twice_merges_metadata_and_keeps_second_content() {
        let mut msg = Message::ai_initial(attempt_id());
        msg.to_final(
            "v1",
            MessageMetadata {
                tool_calls: vec!["lookup_item".into()],
                ..Default::default()
            },
        );
        msg.to_final(
            "v2",
            MessageMetadata {
                tool_calls: vec!["fetch_material".into()],
                tool_results: vec!["ok".into()],
                ..Default::default()
            },
        );

        assert_eq!(msg.status, MessageStatus::Final);
        assert_eq!(msg.content, "v2");
        assert_eq!(msg.metadata.tool_calls, vec!["lookup_item", "fetch_material"]);
        assert_eq!(msg.metadata.tool_results, vec!["ok"]);
    }

    #[test]
    fn metadata_merge_appends_never_replaces() {
        let mut msg = Message::ai_initial(attempt_id());
        msg.metadata.tool_calls.push("lookup_item".into());
        msg.to_streaming().unwrap();
        msg.to_final(
            "answer",
            MessageMetadata {
                tool_calls: vec!["fetch_material".into()],
                tool_results: vec!["ok".into()],
                item_id: Some("item-3".into()),
            },
        );

        assert_eq!(msg.metadata.tool_calls, vec!["lookup_item", "fetch_material"]);
        assert_eq!(msg.metadata.tool_results, vec!["ok"]);
        assert_eq!(msg.metadata.item_id.as_deref(), Some("item-3"));
    }

    #[test]
    fn merge_keeps_existing_item_id() {
        let mut meta = MessageMetadata {
            item_id: Some("item-1".into()),
            ..Default::default()
        };
        meta.merge(MessageMetadata {
            item_id: Some("item-2".into()),
            ..Default::default()
        });
        assert_eq!(meta.item_id.as_deref(), Some("item-1"));
    }
}

//! Prompt segment value objects.

use serde::{Deserialize, Serialize};

/// Role a prompt segment is sent under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentRole {
    System,
    User,
    Assistant,
}

/// One ordered part of an assembled prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSegment {
    pub role: SegmentRole,
    pub text: String,
}

impl PromptSegment {
    /// Creates a system segment.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: SegmentRole::System,
            text: text.into(),
        }
    }

    /// Creates a user segment.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: SegmentRole::User,
            text: text.into(),
        }
    }

    /// Creates an assistant segment.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: SegmentRole::Assistant,
            text: text.into(),
        }
    }
}

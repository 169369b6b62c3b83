//! Strongly-typed identifier value objects.
//!
//! Record-store ids are opaque strings (the store mints them); ids created
//! locally before persistence use UUIDs rendered as strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::ValidationError;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an id from an existing record-store identifier.
            ///
            /// Fails on empty input; the store never mints empty ids.
            pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
                let raw = raw.into();
                if raw.trim().is_empty() {
                    return Err(ValidationError::empty_field(stringify!($name)));
                }
                Ok(Self(raw))
            }

            /// Mints a fresh local id for a record created before persistence.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Returns the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// Unique identifier for a user.
    UserId
}

string_id! {
    /// Unique identifier for a quiz.
    QuizId
}

string_id! {
    /// Unique identifier for a quiz attempt.
    AttemptId
}

string_id! {
    /// Unique identifier for an uploaded study material.
    MaterialId
}

string_id! {
    /// Unique identifier for a message in an attempt conversation.
    MessageId
}

string_id! {
    /// Unique identifier for a subscription record.
    SubscriptionId
}

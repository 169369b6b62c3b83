//! Attempt module - quiz attempts and their streamed message lifecycle.

mod attempt;
mod message;

pub use attempt::{Attempt, Choice};
pub use message::{Message, MessageMetadata, MessageRole, MessageStatus};

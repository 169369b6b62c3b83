//! Prompt cache key derivation.
//!
//! The key ties a logical operation to the provider-side prompt cache and
//! doubles as the idempotency/tracing correlation key. Same entity, same
//! key, stable across retries.

use crate::domain::foundation::{AttemptId, QuizId};

/// Cache key for operations scoped to an attempt: `attempt-{id}`.
pub fn attempt_cache_key(attempt_id: &AttemptId) -> String {
    format!("attempt-{}", attempt_id)
}

/// Cache key for operations scoped to a quiz: `quiz-{id}`.
pub fn quiz_cache_key(quiz_id: &QuizId) -> String {
    format!("quiz-{}", quiz_id)
}

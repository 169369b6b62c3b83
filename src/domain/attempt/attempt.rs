//! Attempt aggregate entity.

use crate::domain::foundation::{AttemptId, MessageId, QuizId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// One answered item within an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// The quiz item answered.
    pub item_id: String,
    /// Index of the option the user picked.
    pub idx: usize,
    /// Whether the pick matched the item's correct index.
    pub correct: bool,
}

/// A user's pass through a quiz.
///
/// # Invariants
///
/// - `feedback` is set at most once; re-finalizing a feedback-complete
///   attempt is a no-op.
/// - `choices` is append-only and ordered by answer time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: AttemptId,
    pub user_id: UserId,
    pub quiz_id: QuizId,
    /// Ordered answers given so far.
    pub choices: Vec<Choice>,
    /// Natural-language feedback, set exactly once at finalization.
    pub feedback: Option<String>,
    /// Conversation messages belonging to this attempt.
    pub message_history: Vec<MessageId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Attempt {
    /// Starts a fresh attempt on a quiz.
    pub fn new(id: AttemptId, user_id: UserId, quiz_id: QuizId) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            user_id,
            quiz_id,
            choices: Vec::new(),
            feedback: None,
            message_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Records one answered item.
    pub fn record_choice(&mut self, item_id: impl Into<String>, idx: usize, correct: bool) {
        self.choices.push(Choice {
            item_id: item_id.into(),
            idx,
            correct,
        });
        self.updated_at = Timestamp::now();
    }

    /// True once feedback has been generated (or skipped with a placeholder).
    pub fn is_finalized(&self) -> bool {
        self.feedback.is_some()
    }

    /// Sets feedback if not already present.
    ///
    /// Returns true when the write happened; false means the attempt was
    /// already finalized and nothing changed (idempotent finalize).
    pub fn set_feedback_once(&mut self, feedback: impl Into<String>) -> bool {
        if self.feedback.is_some() {
            return false;
        }
        self.feedback = Some(feedback.into());
        self.updated_at = Timestamp::now();
        true
    }

    /// Fraction of answered items that were correct, if any were answered.
    pub fn score(&self) -> Option<f64> {
        if self.choices.is_empty() {
            return None;
        }
        let correct = self.choices.iter().filter(|c| c.correct).count();
        Some(correct as f64 / self.choices.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt() -> Attempt {
        Attempt::new(
            AttemptId::new("attempt-1").unwrap(),
            UserId::new("user-1").unwrap(),
            QuizId::new("quiz-1").unwrap(),
        )
    }

    #[test]
    fn new_attempt_has_no_feedback() {
        assert!(!attempt().is_finalized());
        assert!(attempt().score().is_none());
    }

    #[test]
    fn choices_keep_answer_order() {
        let mut a = attempt();
        a.record_choice("item-1", 2, false);
        a.record_choice("item-2", 0, true);
        assert_eq!(a.choices.len(), 2);
        assert_eq!(a.choices[0].item_id, "item-1");
        assert_eq!(a.choices[1].item_id, "item-2");
    }

    #[test]
    fn feedback_is_set_exactly_once() {
        let mut a = attempt();
        assert!(a.set_feedback_once("good work"));
        assert!(!a.set_feedback_once("overwritten"));
        assert_eq!(a.feedback.as_deref(), Some("good work"));
    }

    #[test]
    fn empty_placeholder_still_counts_as_finalized() {
        // Free-tier finalize stores an empty string instead of generating.
        let mut a = attempt();
        assert!(a.set_feedback_once(""));
        assert!(a.is_finalized());
        assert!(!a.set_feedback_once("late feedback"));
    }

    #[test]
    fn score_is_fraction_correct() {
        let mut a = attempt();
        a.record_choice("i1", 0, true);
        a.record_choice("i2", 1, false);
        a.record_choice("i3", 2, true);
        let score = a.score().unwrap();
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
    }
}

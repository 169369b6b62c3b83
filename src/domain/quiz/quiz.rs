//! Quiz aggregate entity.

use crate::domain::foundation::{MaterialId, QuizId, StateMachine, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizStatus {
    /// Created, no generation round has completed yet.
    Draft,
    /// A generation round is in flight.
    Generating,
    /// Summarized and indexed; immutable unless a forced re-finalize runs.
    Final,
}

impl StateMachine for QuizStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use QuizStatus::*;
        matches!(
            (self, target),
            (Draft, Generating) | (Generating, Draft) | (Generating, Final) | (Draft, Final)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use QuizStatus::*;
        match self {
            Draft => vec![Generating, Final],
            Generating => vec![Draft, Final],
            Final => vec![],
        }
    }
}

/// Requested difficulty band for generated items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Expert,
}

impl Difficulty {
    /// Prompt instruction for this difficulty band.
    pub fn instruction(&self) -> &'static str {
        match self {
            Difficulty::Beginner => {
                "Target newcomers: prefer definitional and recognition questions."
            }
            Difficulty::Intermediate => {
                "Target learners with working knowledge: mix application and recall."
            }
            Difficulty::Expert => {
                "Target experts: prefer synthesis, edge cases, and tradeoff questions."
            }
        }
    }
}

/// One generated quiz item (question plus answer options).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizItem {
    pub id: String,
    pub question: String,
    /// Answer options in presentation order.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub correct_idx: usize,
    /// Short rationale shown after answering.
    pub rationale: Option<String>,
}

/// Quiz aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: QuizId,
    pub owner_id: UserId,
    pub title: String,
    pub status: QuizStatus,
    pub difficulty: Difficulty,
    /// Generated items, in generation order.
    pub items: Vec<QuizItem>,
    /// Materials attached to this quiz.
    pub material_ids: Vec<MaterialId>,
    /// Owner-written summary of what the quiz should cover.
    pub topic: String,
    /// AI-generated summary, set at finalization.
    pub summary: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Quiz {
    /// Creates a new draft quiz.
    pub fn new(id: QuizId, owner_id: UserId, title: impl Into<String>, topic: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            owner_id,
            title: title.into(),
            status: QuizStatus::Draft,
            difficulty: Difficulty::Intermediate,
            items: Vec::new(),
            material_ids: Vec::new(),
            topic: topic.into(),
            summary: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// True once the quiz has been finalized.
    pub fn is_final(&self) -> bool {
        self.status == QuizStatus::Final
    }

    /// Questions of all existing items, used to exclude repeats from the
    /// next generation round.
    pub fn existing_questions(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.question.as_str()).collect()
    }
}

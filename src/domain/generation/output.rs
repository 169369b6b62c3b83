//! Typed model output schemas.
//!
//! Every generation call declares which variant it expects; the response is
//! parsed into the tagged union and matched exhaustively. A schema-valid
//! payload carrying the wrong mode tag is a contract bug, never coerced.

use crate::domain::quiz::QuizItem;
use serde::{Deserialize, Serialize};

/// Discriminant tag selecting an output schema variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Quiz,
    Explanation,
    Feedback,
    Summary,
    Trim,
}

impl OutputMode {
    /// Retry budget for calls expecting this mode.
    ///
    /// Multi-step reasoning outputs get the full budget; simple extraction
    /// outputs fail fast.
    pub fn max_retries(&self) -> u32 {
        match self {
            OutputMode::Quiz | OutputMode::Explanation | OutputMode::Feedback => 3,
            OutputMode::Summary | OutputMode::Trim => 1,
        }
    }

    /// Prompt template name for this mode.
    pub fn template_name(&self) -> &'static str {
        match self {
            OutputMode::Quiz => "generate-quiz-items",
            OutputMode::Explanation => "explain-answer",
            OutputMode::Feedback => "attempt-feedback",
            OutputMode::Summary => "summarize-quiz",
            OutputMode::Trim => "trim-history",
        }
    }
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OutputMode::Quiz => "quiz",
            OutputMode::Explanation => "explanation",
            OutputMode::Feedback => "feedback",
            OutputMode::Summary => "summary",
            OutputMode::Trim => "trim",
        };
        write!(f, "{}", s)
    }
}

/// Newly generated quiz items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizPayload {
    pub items: Vec<QuizItem>,
}

/// An answer explanation for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationPayload {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
}

/// End-of-attempt feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackPayload {
    pub text: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
}

/// Quiz summary for search indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryPayload {
    pub summary: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Trimmed conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimPayload {
    pub condensed: String,
}

/// Discriminated union of everything a generation call may return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum GenerationOutput {
    Quiz(QuizPayload),
    Explanation(ExplanationPayload),
    Feedback(FeedbackPayload),
    Summary(SummaryPayload),
    Trim(TrimPayload),
}

impl GenerationOutput {
    /// The mode tag this payload carries.
    pub fn mode(&self) -> OutputMode {
        match self {
            GenerationOutput::Quiz(_) => OutputMode::Quiz,
            GenerationOutput::Explanation(_) => OutputMode::Explanation,
            GenerationOutput::Feedback(_) => OutputMode::Feedback,
            GenerationOutput::Summary(_) => OutputMode::Summary,
            GenerationOutput::Trim(_) => OutputMode::Trim,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_tag_selects_variant() {
        let json = r#"{"mode":"summary","summary":"covers ownership","keywords":["rust"]}"#;
        let output: GenerationOutput = serde_json::from_str(json).unwrap();
        assert_eq!(output.mode(), OutputMode::Summary);
        match output {
            GenerationOutput::Summary(payload) => {
                assert_eq!(payload.summary, "covers ownership");
                assert_eq!(payload.keywords, vec!["rust"]);
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn unknown_mode_tag_is_a_hard_error() {
        let json = r#"{"mode":"poem","text":"roses"}"#;
        assert!(serde_json::from_str::<GenerationOutput>(json).is_err());
    }

    #[test]
    fn quiz_payload_roundtrips() {
        let output = GenerationOutput::Quiz(QuizPayload {
            items: vec![crate::domain::quiz::QuizItem {
                id: "i1".into(),
                question: "?".into(),
                options: vec!["a".into(), "b".into()],
                correct_idx: 1,
                rationale: Some("because".into()),
            }],
        });
        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("\"mode\":\"quiz\""));
        let back: GenerationOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, output);
    }

    #[test]
    fn reasoning_modes_get_more_retries_than_extraction() {
        assert_eq!(OutputMode::Quiz.max_retries(), 3);
        assert_eq!(OutputMode::Feedback.max_retries(), 3);
        assert_eq!(OutputMode::Summary.max_retries(), 1);
        assert_eq!(OutputMode::Trim.max_retries(), 1);
    }

    #[test]
    fn template_names_are_per_mode() {
        assert_eq!(OutputMode::Quiz.template_name(), "generate-quiz-items");
        assert_eq!(OutputMode::Explanation.template_name(), "explain-answer");
    }
}

//! Generation module - typed model outputs, usage accounting, cache keys.

mod cache_key;
mod output;
mod usage;

pub use cache_key::{attempt_cache_key, quiz_cache_key};
pub use output::{
    ExplanationPayload, FeedbackPayload, GenerationOutput, OutputMode, QuizPayload,
    SummaryPayload, TrimPayload,
};
pub use usage::{ModelRates, TokenUsage};

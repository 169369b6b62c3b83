//! Dynamic generation steering configuration.
//!
//! Owner-supplied free-text directives that conditionally extend the prompt
//! between generation rounds. Pure input to prompt assembly.

use serde::{Deserialize, Serialize};

/// Per-quiz generation steering state.
///
/// Each field is an ordered list of directives; empty lists contribute
/// nothing to the assembled prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicConfig {
    /// Specific questions or topics to add verbatim.
    #[serde(default)]
    pub adds: Vec<String>,
    /// Topics to emphasize in the next round.
    #[serde(default, rename = "moreOnTopic")]
    pub more_on_topic: Vec<String>,
    /// Topics to de-emphasize in the next round.
    #[serde(default, rename = "lessOnTopic")]
    pub less_on_topic: Vec<String>,
    /// Extra beginner-level coverage requests.
    #[serde(default, rename = "extraBeginner")]
    pub extra_beginner: Vec<String>,
    /// Extra expert-level coverage requests.
    #[serde(default, rename = "extraExpert")]
    pub extra_expert: Vec<String>,
}

impl DynamicConfig {
    /// True when no directive list has entries.
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty()
            && self.more_on_topic.is_empty()
            && self.less_on_topic.is_empty()
            && self.extra_beginner.is_empty()
            && self.extra_expert.is_empty()
    }
}

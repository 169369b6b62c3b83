//! Deterministic prompt assembly.
//!
//! Folds a snapshot of mutable domain state into an ordered segment list.
//! The fold is a pure function: identical input state yields a byte-identical
//! sequence, which is what lets provider-side prompt caching hit across
//! retries of the same logical call.
//!
//! Segment phases, in order:
//!
//! 1. **pre-parts**: prior attempt history, the user-authored query, raw
//!    material text, material byte/URL references.
//! 2. **system/base**: the task template, already resolved and
//!    parameter-substituted by the caller through the template store.
//! 3. **post-parts**: one block per non-empty directive list, in a fixed
//!    order: adds, previous-items exclusion, difficulty, extra-beginner,
//!    extra-expert, more-on-topic, less-on-topic, materials-context.
//!    Empty lists contribute nothing, not even a header.

use crate::domain::quiz::{Difficulty, DynamicConfig};

use super::{PromptSegment, SegmentRole};

/// One prior conversation turn included in the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTurn {
    pub role: SegmentRole,
    pub content: String,
}

/// Snapshot of everything prompt assembly reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyInput {
    /// Prior conversation turns, oldest first.
    pub history: Vec<HistoryTurn>,
    /// The user-authored query for explainer calls.
    pub user_query: Option<String>,
    /// Extracted text of attached materials, in attachment order.
    pub material_texts: Vec<String>,
    /// Material byte/URL reference lines, in attachment order.
    pub material_refs: Vec<String>,
    /// Owner steering directives.
    pub dynamic: DynamicConfig,
    /// Questions of already-generated items, excluded from the next round.
    pub previous_questions: Vec<String>,
    /// Requested difficulty band.
    pub difficulty: Option<Difficulty>,
    /// Pre-computed materials-context text.
    pub materials_context: Option<String>,
}

/// Assembles the full ordered segment sequence for one generation call.
///
/// `system_template` is the task instruction template, already resolved
/// against the versioned template store; assembly only owns ordering and
/// inclusion.
pub fn assemble(input: &AssemblyInput, system_template: &str) -> Vec<PromptSegment> {
    let mut segments = Vec::new();

    // Pre-parts.
    for turn in &input.history {
        segments.push(PromptSegment {
            role: turn.role,
            text: turn.content.clone(),
        });
    }
    if let Some(query) = &input.user_query {
        segments.push(PromptSegment::user(query.clone()));
    }
    for text in &input.material_texts {
        segments.push(PromptSegment::user(format!("Study material:\n{}", text)));
    }
    for reference in &input.material_refs {
        segments.push(PromptSegment::user(reference.clone()));
    }

    // System/base part.
    segments.push(PromptSegment::system(system_template.to_string()));

    // Post-parts, fixed order, each included iff its source is non-empty.
    push_block(
        &mut segments,
        "Include these requested questions or topics:",
        &input.dynamic.adds,
    );
    push_block(
        &mut segments,
        "Do not repeat any of these existing questions:",
        &input.previous_questions,
    );
    if let Some(difficulty) = input.difficulty {
        segments.push(PromptSegment::system(difficulty.instruction().to_string()));
    }
    push_block(
        &mut segments,
        "Add extra beginner-level coverage for:",
        &input.dynamic.extra_beginner,
    );
    push_block(
        &mut segments,
        "Add extra expert-level coverage for:",
        &input.dynamic.extra_expert,
    );
    push_block(
        &mut segments,
        "Focus more on these topics:",
        &input.dynamic.more_on_topic,
    );
    push_block(
        &mut segments,
        "Focus less on these topics:",
        &input.dynamic.less_on_topic,
    );
    if let Some(context) = &input.materials_context {
        segments.push(PromptSegment::system(format!(
            "Context from the attached materials:\n{}",
            context
        )));
    }

    segments
}

fn push_block(segments: &mut Vec<PromptSegment>, header: &str, entries: &[String]) {
    if entries.is_empty() {
        return;
    }
    let mut text = String::from(header);
    for entry in entries {
        text.push_str("\n- ");
        text.push_str(entry);
    }
    segments.push(PromptSegment::system(text));
}

//! Prompt module - deterministic prompt segment assembly.

mod assembly;
mod segment;

pub use assembly::{assemble, AssemblyInput, HistoryTurn};
pub use segment::{PromptSegment, SegmentRole};

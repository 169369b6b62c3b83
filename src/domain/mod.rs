//! Domain layer - pure business logic, no I/O.

pub mod attempt;
pub mod billing;
pub mod foundation;
pub mod generation;
pub mod prompt;
pub mod quiz;

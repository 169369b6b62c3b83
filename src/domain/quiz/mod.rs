//! Quiz module - quiz aggregate, generation steering config, and materials.

mod dynamic_config;
mod material;
mod quiz;

pub use dynamic_config::DynamicConfig;
pub use material::{Material, MaterialSource};
pub use quiz::{Difficulty, Quiz, QuizItem, QuizStatus};

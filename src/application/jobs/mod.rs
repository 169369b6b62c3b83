//! Background job pipeline: dispatcher, worker pool, and handlers.

pub mod dispatcher;
pub mod handlers;
pub mod worker;

pub use dispatcher::JobDispatcher;
pub use worker::JobWorker;

/// Job handler names as they appear on the wire.
pub mod names {
    pub const START_QUIZ: &str = "start_quiz";
    pub const GENERATE_QUIZ_ITEMS: &str = "generate_quiz_items";
    pub const FINALIZE_QUIZ: &str = "finalize_quiz";
    pub const FINALIZE_ATTEMPT: &str = "finalize_attempt";
    pub const ADD_MATERIAL: &str = "add_material";
    pub const REMOVE_MATERIAL: &str = "remove_material";
}

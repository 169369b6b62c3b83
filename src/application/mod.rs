//! Application layer - orchestration over the domain and the ports.

pub mod agent_runner;
pub mod billing_webhook;
pub mod context;
pub mod jobs;
pub mod lock;
pub mod quota;
pub mod streaming;
#[cfg(test)]
pub mod testing;

pub use agent_runner::{AgentRunner, GenerationRun, GenerationSettings};
pub use billing_webhook::{BillingEvent, WebhookProcessor};
pub use context::{AppContext, Ports};
pub use jobs::{JobDispatcher, JobWorker};
pub use lock::{LockManager, LockSettings};
pub use quota::QuotaLedger;
pub use streaming::{StreamEvent, StreamSession, StreamingBridge};

/// Record store collection names.
pub mod collections {
    pub const SUBSCRIPTIONS: &str = "subscriptions";
    pub const QUIZZES: &str = "quizzes";
    pub const ATTEMPTS: &str = "attempts";
    pub const MESSAGES: &str = "messages";
    pub const MATERIALS: &str = "materials";
}

/// Search index names.
pub mod indexes {
    pub const QUIZZES: &str = "quizzes";
    pub const MATERIALS: &str = "materials";
}

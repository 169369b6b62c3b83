//! Shared test wiring: an `AppContext` over the in-memory adapters.

use std::sync::Arc;
use std::time::Duration;

use crate::adapters::ai::MockAiProvider;
use crate::adapters::auth::StaticTokenVerifier;
use crate::adapters::lock::InMemoryEntityLock;
use crate::adapters::parser::PlainTextParser;
use crate::adapters::queue::InMemoryWorkQueue;
use crate::adapters::record_store::InMemoryRecordStore;
use crate::adapters::search::InMemorySearchIndex;
use crate::adapters::storage::InMemoryObjectStorage;
use crate::adapters::templates::YamlTemplateStore;

use super::agent_runner::GenerationSettings;
use super::context::{AppContext, Ports};
use super::lock::LockSettings;

/// Default template set used by handler tests.
pub const TEST_TEMPLATES: &str = r#"
generate-quiz-items:
  production:
    version: 1
    text: "Write {item_count} quiz items about {topic}."
explain-answer:
  production:
    version: 1
    text: "Explain the answer."
attempt-feedback:
  production:
    version: 1
    text: "Write feedback for the finished attempt."
summarize-quiz:
  production:
    version: 1
    text: "Summarize the quiz for search."
trim-history:
  production:
    version: 1
    text: "Condense the conversation so far."
"#;

/// Concrete adapter handles the tests assert against.
pub struct TestFixtures {
    pub store: Arc<InMemoryRecordStore>,
    pub queue: Arc<InMemoryWorkQueue>,
    pub provider: Arc<MockAiProvider>,
    pub search: Arc<InMemorySearchIndex>,
    pub lock: Arc<InMemoryEntityLock>,
    pub storage: Arc<InMemoryObjectStorage>,
}

/// Builds an `AppContext` over fresh in-memory adapters.
pub async fn test_context() -> (Arc<AppContext>, TestFixtures) {
    let store = Arc::new(InMemoryRecordStore::new());
    let queue = Arc::new(InMemoryWorkQueue::new());
    let provider = Arc::new(MockAiProvider::new());
    let search = Arc::new(InMemorySearchIndex::new());
    let lock = Arc::new(InMemoryEntityLock::new());
    let storage = Arc::new(InMemoryObjectStorage::new());
    let templates = Arc::new(YamlTemplateStore::from_str(TEST_TEMPLATES).unwrap());

    let ctx = AppContext::new(
        Ports {
            store: store.clone(),
            search: search.clone(),
            queue: queue.clone(),
            provider: provider.clone(),
            templates,
            parser: Arc::new(PlainTextParser::new()),
            storage: storage.clone(),
            entity_lock: lock.clone(),
            verifier: Arc::new(StaticTokenVerifier::new()),
        },
        GenerationSettings::default(),
        LockSettings {
            ttl: Duration::from_secs(5),
            wait_timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(10),
        },
    );

    (
        ctx,
        TestFixtures {
            store,
            queue,
            provider,
            search,
            lock,
            storage,
        },
    )
}

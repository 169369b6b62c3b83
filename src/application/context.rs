//! Application context - the dependency container built once at startup.
//!
//! Holds every port behind an `Arc` plus the orchestration services wired
//! over them. Handlers and workers receive `Arc<AppContext>`; nothing in the
//! crate reaches for ambient globals.

use std::sync::Arc;

use crate::ports::{
    AiProvider, DocumentParser, EntityLock, ObjectStorage, PromptTemplates, RecordStore,
    SearchIndex, TokenVerifier, WorkQueue,
};

use super::agent_runner::{AgentRunner, GenerationSettings};
use super::jobs::JobDispatcher;
use super::lock::{LockManager, LockSettings};
use super::quota::QuotaLedger;
use super::streaming::StreamingBridge;

/// Capacity of the SSE chunk channel per stream.
const STREAM_BUFFER: usize = 64;

/// Everything the application layer needs, built once.
pub struct AppContext {
    pub store: Arc<dyn RecordStore>,
    pub search: Arc<dyn SearchIndex>,
    pub queue: Arc<dyn WorkQueue>,
    pub provider: Arc<dyn AiProvider>,
    pub templates: Arc<dyn PromptTemplates>,
    pub parser: Arc<dyn DocumentParser>,
    pub storage: Arc<dyn ObjectStorage>,
    pub verifier: Arc<dyn TokenVerifier>,

    pub ledger: QuotaLedger,
    pub locks: LockManager,
    pub runner: AgentRunner,
    pub bridge: StreamingBridge,
    pub dispatcher: JobDispatcher,
}

/// Raw ports handed to the context builder.
pub struct Ports {
    pub store: Arc<dyn RecordStore>,
    pub search: Arc<dyn SearchIndex>,
    pub queue: Arc<dyn WorkQueue>,
    pub provider: Arc<dyn AiProvider>,
    pub templates: Arc<dyn PromptTemplates>,
    pub parser: Arc<dyn DocumentParser>,
    pub storage: Arc<dyn ObjectStorage>,
    pub entity_lock: Arc<dyn EntityLock>,
    pub verifier: Arc<dyn TokenVerifier>,
}

impl AppContext {
    /// Wires the orchestration services over the given ports.
    pub fn new(
        ports: Ports,
        generation: GenerationSettings,
        lock_settings: LockSettings,
    ) -> Arc<Self> {
        let ledger = QuotaLedger::new(Arc::clone(&ports.store));
        let locks = LockManager::new(Arc::clone(&ports.entity_lock), lock_settings);
        let runner = AgentRunner::new(
            Arc::clone(&ports.provider),
            Arc::clone(&ports.templates),
            generation,
        );
        let bridge = StreamingBridge::new(
            Arc::clone(&ports.store),
            ledger.clone(),
            STREAM_BUFFER,
        );
        let dispatcher = JobDispatcher::new(Arc::clone(&ports.queue));

        Arc::new(Self {
            store: ports.store,
            search: ports.search,
            queue: ports.queue,
            provider: ports.provider,
            templates: ports.templates,
            parser: ports.parser,
            storage: ports.storage,
            verifier: ports.verifier,
            ledger,
            locks,
            runner,
            bridge,
            dispatcher,
        })
    }
}

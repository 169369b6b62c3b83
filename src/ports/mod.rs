//! Ports - interfaces to external collaborators.
//!
//! Each port is an `async_trait` the application layer depends on; adapters
//! provide production and in-memory implementations.

mod ai_provider;
mod document_parser;
mod entity_lock;
mod object_storage;
mod prompt_templates;
mod record_store;
mod search_index;
mod token_verifier;
mod work_queue;

pub use ai_provider::{
    AiError, AiProvider, CompletionRequest, CompletionResponse, DeltaStream, RequestMetadata,
    StreamChunk,
};
pub use document_parser::{DocumentParser, ParseError, ParsedDocument};
pub use entity_lock::{EntityLock, LockError, LockToken};
pub use object_storage::{ObjectStorage, StorageError};
pub use prompt_templates::{PromptTemplates, TemplateError};
pub use record_store::{Filter, Patch, Record, RecordStore, RecordStoreError, SortOrder};
pub use search_index::{SearchDocument, SearchIndex, SearchIndexError, TaskHandle, TaskStatus};
pub use token_verifier::{AuthClaims, AuthError, TokenVerifier};
pub use work_queue::{JobEnvelope, QueueError, WorkQueue};

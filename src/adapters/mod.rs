//! Adapters - implementations of the ports against real collaborators,
//! plus in-memory doubles for tests.

pub mod ai;
pub mod auth;
pub mod http;
pub mod lock;
pub mod parser;
pub mod queue;
pub mod record_store;
pub mod search;
pub mod storage;
pub mod templates;

//! Record store adapters.

mod http;
mod in_memory;

pub use http::{HttpRecordStore, RecordStoreConfig};
pub use in_memory::InMemoryRecordStore;

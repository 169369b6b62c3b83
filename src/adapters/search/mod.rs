//! Search index adapters.

mod http;
mod in_memory;

pub use http::{HttpSearchIndex, SearchIndexConfig};
pub use in_memory::InMemorySearchIndex;

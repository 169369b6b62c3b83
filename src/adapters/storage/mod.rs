//! Object storage adapters.

mod fs;
mod in_memory;

pub use fs::FsObjectStorage;
pub use in_memory::InMemoryObjectStorage;

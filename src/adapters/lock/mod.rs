//! Entity lock adapters.

mod in_memory;
mod redis;

pub use in_memory::InMemoryEntityLock;
pub use redis::RedisEntityLock;

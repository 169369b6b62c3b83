//! Document parser adapters.

mod plain_text;

pub use plain_text::PlainTextParser;

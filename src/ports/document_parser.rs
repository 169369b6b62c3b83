//! DocumentParser port - text extraction from uploaded documents.

use async_trait::async_trait;
use thiserror::Error;

/// Extracted document content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    /// Plain text extracted from the document.
    pub text: String,
    /// Page or section count, when the format has one.
    pub section_count: Option<u32>,
}

/// Parser errors.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("document could not be parsed: {0}")]
    Malformed(String),

    #[error("parser unavailable: {0}")]
    Unavailable(String),
}

/// Port for the document parsing service.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    /// Extracts text from raw document bytes.
    async fn parse(&self, bytes: &[u8], filename: &str) -> Result<ParsedDocument, ParseError>;
}

//! Parser for plain-text and markdown uploads.
//!
//! Binary document formats (PDF, DOCX) go to an external parsing service in
//! deployments that enable one; this adapter covers the text formats the
//! product accepts everywhere.

use async_trait::async_trait;

use crate::ports::{DocumentParser, ParseError, ParsedDocument};

/// Parser for `.txt` and `.md` uploads.
#[derive(Default, Clone)]
pub struct PlainTextParser;

impl PlainTextParser {
    /// Creates the parser.
    pub fn new() -> Self {
        Self
    }

    fn extension(filename: &str) -> &str {
        filename.rsplit('.').next().unwrap_or_default()
    }
}

#[async_trait]
impl DocumentParser for PlainTextParser {
    async fn parse(&self, bytes: &[u8], filename: &str) -> Result<ParsedDocument, ParseError> {
        let ext = Self::extension(filename).to_ascii_lowercase();
        if ext != "txt" && ext != "md" && ext != "markdown" {
            return Err(ParseError::UnsupportedFormat(ext));
        }
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|e| ParseError::Malformed(format!("not valid UTF-8: {}", e)))?;
        // Blank-line separated blocks stand in for sections.
        let section_count = text
            .split("\n\n")
            .filter(|block| !block.trim().is_empty())
            .count() as u32;
        Ok(ParsedDocument {
            text,
            section_count: Some(section_count),
        })
    }
}

//! Uploaded study material records.

use crate::domain::foundation::{MaterialId, QuizId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Where a material's raw content lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaterialSource {
    /// Uploaded bytes in object storage.
    Upload { storage_path: String, filename: String },
    /// Remote document fetched by URL.
    Url { url: String },
}

/// One uploaded or linked study material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub id: MaterialId,
    pub owner_id: UserId,
    pub quiz_id: QuizId,
    pub source: MaterialSource,
    /// Extracted text, set once the document parser has run.
    pub extracted_text: Option<String>,
    /// Size of the raw document in bytes.
    pub byte_size: u64,
    pub created_at: Timestamp,
}

impl Material {
    /// Reference line included in prompt pre-parts.
    pub fn reference(&self) -> String {
        match &self.source {
            MaterialSource::Upload { filename, .. } => {
                format!("[file: {} ({} bytes)]", filename, self.byte_size)
            }
            MaterialSource::Url { url } => format!("[url: {}]", url),
        }
    }
}

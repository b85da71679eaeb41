//! Document, chunk, and graph triple types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A source document, immutable after ingest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Display title (used in quiz titles and prompts)
    pub title: String,
    /// Raw extracted text
    pub content: String,
    /// Whether chunks and indices have been built
    pub processed: bool,
    /// Ingestion timestamp
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Create a new, unprocessed document
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            content: content.into(),
            processed: false,
            created_at: Utc::now(),
        }
    }
}

/// A contiguous slice of a document's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Position within the document, contiguous from 0
    pub ordinal: u32,
    /// Text content
    pub text: String,
    /// Character offset of the chunk start in the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_start: Option<usize>,
    /// Character offset of the chunk end in the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_end: Option<usize>,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(document_id: Uuid, ordinal: u32, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            ordinal,
            text: text.into(),
            char_start: None,
            char_end: None,
        }
    }

    /// Attach character offsets
    pub fn with_offsets(mut self, start: usize, end: usize) -> Self {
        self.char_start = Some(start);
        self.char_end = Some(end);
        self
    }
}

/// A (subject, relation, object) fact extracted from a chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphTriple {
    pub subject: String,
    pub relation: String,
    pub object: String,
    /// Chunk the triple was extracted from
    pub chunk_id: Uuid,
    pub document_id: Uuid,
}

impl GraphTriple {
    /// Whether the subject or object contains the (already lowercased) entity
    pub fn mentions(&self, entity_lower: &str) -> bool {
        self.subject.to_lowercase().contains(entity_lower)
            || self.object.to_lowercase().contains(entity_lower)
    }
}

//! Document and chunk types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Metadata attached to documents and inherited by their chunks
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Metadata key: source file name
pub const META_FILE_NAME: &str = "file_name";
/// Metadata key: first source page (1-indexed)
pub const META_PAGE_NUMBER: &str = "page_number";
/// Metadata key: last source page when several pages were grouped
pub const META_END_PAGE_NUMBER: &str = "end_page_number";
/// Metadata key: position of a chunk within its document
pub const META_CHUNK_INDEX: &str = "chunk_index";

/// Text extracted from one or more PDF pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable document ID (derived from file name and first page)
    pub id: Uuid,
    /// Cleaned page text
    pub content: String,
    /// Source metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Create a document for the page range `first_page..=last_page` of `file_name`
    pub fn from_pages(file_name: &str, first_page: u32, last_page: u32, content: String) -> Self {
        let id = Uuid::new_v5(
            &Uuid::NAMESPACE_URL,
            format!("{}#page={}", file_name, first_page).as_bytes(),
        );

        let mut metadata = Metadata::new();
        metadata.insert(META_FILE_NAME.to_string(), serde_json::json!(file_name));
        metadata.insert(META_PAGE_NUMBER.to_string(), serde_json::json!(first_page));
        if last_page != first_page {
            metadata.insert(META_END_PAGE_NUMBER.to_string(), serde_json::json!(last_page));
        }

        Self {
            id,
            content,
            metadata,
        }
    }

    /// First source page, if known
    pub fn page_number(&self) -> Option<u32> {
        self.metadata
            .get(META_PAGE_NUMBER)
            .and_then(|v| v.as_u64())
            .map(|p| p as u32)
    }

    /// Check whether the document carries any non-whitespace text
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// A bounded slice of a document's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk ID (derived from the document ID and chunk index)
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Text content
    pub content: String,
    /// Chunk index within the document
    pub chunk_index: u32,
    /// Byte range in the parent document's content
    pub char_start: usize,
    pub char_end: usize,
    /// Parent metadata plus chunk index
    #[serde(default)]
    pub metadata: Metadata,
}

impl Chunk {
    /// Create a chunk covering `char_start..char_end` of `document`
    pub fn new(document: &Document, chunk_index: u32, char_start: usize, char_end: usize) -> Self {
        let id = Uuid::new_v5(&document.id, &chunk_index.to_be_bytes());

        let mut metadata = document.metadata.clone();
        metadata.insert(META_CHUNK_INDEX.to_string(), serde_json::json!(chunk_index));

        Self {
            id,
            document_id: document.id,
            content: document.content[char_start..char_end].to_string(),
            chunk_index,
            char_start,
            char_end,
            metadata,
        }
    }

    /// Source reference for logs, e.g. `pope.pdf, Page 3`
    pub fn source_label(&self) -> String {
        let file = self
            .metadata
            .get(META_FILE_NAME)
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");

        match self.metadata.get(META_PAGE_NUMBER).and_then(|v| v.as_u64()) {
            Some(page) => format!("{}, Page {}", file, page),
            None => file.to_string(),
        }
    }
}

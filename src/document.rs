//! Data types for pages, chunks, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single page of a loaded source document.
///
/// Pages are immutable once loaded; chunking never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    /// The raw text content of the page.
    pub text: String,
    /// Zero-based index of the page within its document.
    pub page_index: usize,
    /// Path of the source document.
    pub source: String,
}

/// A token-bounded segment of a [`Page`].
///
/// Chunks are immutable value objects. IDs are generated as
/// `{source-stem}_{chunk_index}`, and metadata carries the parent page
/// index and source path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// Source metadata inherited from the parent page.
    pub metadata: HashMap<String, String>,
}

impl Chunk {
    /// Build a chunk from its parent page, inheriting source metadata.
    pub fn from_page(page: &Page, chunk_index: usize, text: String) -> Self {
        let stem = std::path::Path::new(&page.source)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("doc")
            .to_string();

        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), page.source.clone());
        metadata.insert("page_index".to_string(), page.page_index.to_string());
        metadata.insert("chunk_index".to_string(), chunk_index.to_string());

        Self { id: format!("{stem}_{chunk_index}"), text, metadata }
    }
}

/// A retrieved [`Chunk`] paired with a similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

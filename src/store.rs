//! Persistent vector store with cosine-similarity search.
//!
//! [`DiskVectorStore`] persists `(chunk, embedding)` entries as JSON in a
//! named directory. The directory is the store's identity: if it exists and
//! is non-empty it is loaded as-is and the supplied chunks are ignored — no
//! merge and no freshness check. Rebuilding with a different embedding
//! model into the same directory is the operator's responsibility.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const ENTRIES_FILE: &str = "entries.json";

/// A queryable index of embedded chunks.
pub trait VectorStore: Send + Sync {
    /// Return the `top_k` entries most similar to `embedding`, ordered by
    /// descending similarity.
    ///
    /// Returns fewer than `top_k` results only when the store holds fewer
    /// entries; an empty store yields an empty sequence, not an error.
    fn search(&self, embedding: &[f32], top_k: usize) -> Vec<SearchResult>;

    /// Number of entries held by the store.
    fn len(&self) -> usize;

    /// Whether the store holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A persisted `(chunk text, embedding, metadata)` triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreEntry {
    /// The stored chunk, including its metadata.
    pub chunk: Chunk,
    /// The chunk's embedding vector.
    pub embedding: Vec<f32>,
}

/// A vector store persisted to a directory, searched in memory.
pub struct DiskVectorStore {
    directory: PathBuf,
    entries: Vec<StoreEntry>,
}

impl DiskVectorStore {
    /// Open an existing store or build a fresh one.
    ///
    /// If `directory` exists and is non-empty, its entries are loaded and
    /// `chunks` is ignored. Otherwise every chunk is embedded through
    /// `provider` and the resulting entries are persisted.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStore`] if the directory cannot be read or
    /// written, or [`RagError::Embedding`] if embedding the chunks fails
    /// during a fresh build.
    pub async fn open_or_build(
        directory: impl Into<PathBuf>,
        chunks: &[Chunk],
        provider: &dyn EmbeddingProvider,
    ) -> Result<Self> {
        let directory = directory.into();

        if dir_has_entries(&directory) {
            let entries = load_entries(&directory)?;
            info!(directory = %directory.display(), entry_count = entries.len(), "opened existing vector store");
            if !chunks.is_empty() {
                warn!("existing store found; supplied chunks are ignored");
            }
            return Ok(Self { directory, entries });
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = provider.embed_batch(&texts).await?;

        let entries: Vec<StoreEntry> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| StoreEntry { chunk: chunk.clone(), embedding })
            .collect();

        persist_entries(&directory, &entries)?;
        info!(directory = %directory.display(), entry_count = entries.len(), "built and persisted vector store");

        Ok(Self { directory, entries })
    }

    /// The directory this store persists to.
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl VectorStore for DiskVectorStore {
    fn search(&self, embedding: &[f32], top_k: usize) -> Vec<SearchResult> {
        let mut scored: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|entry| SearchResult {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(&entry.embedding, embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn dir_has_entries(directory: &Path) -> bool {
    match std::fs::read_dir(directory) {
        Ok(mut iter) => iter.next().is_some(),
        Err(_) => false,
    }
}

fn load_entries(directory: &Path) -> Result<Vec<StoreEntry>> {
    let path = directory.join(ENTRIES_FILE);
    let data = std::fs::read_to_string(&path).map_err(|e| RagError::VectorStore {
        backend: "disk".into(),
        message: format!("failed to read {}: {e}", path.display()),
    })?;
    serde_json::from_str(&data).map_err(|e| RagError::VectorStore {
        backend: "disk".into(),
        message: format!("failed to parse {}: {e}", path.display()),
    })
}

fn persist_entries(directory: &Path, entries: &[StoreEntry]) -> Result<()> {
    std::fs::create_dir_all(directory).map_err(|e| RagError::VectorStore {
        backend: "disk".into(),
        message: format!("failed to create {}: {e}", directory.display()),
    })?;
    let path = directory.join(ENTRIES_FILE);
    let data = serde_json::to_string(entries).map_err(|e| RagError::VectorStore {
        backend: "disk".into(),
        message: format!("failed to serialize entries: {e}"),
    })?;
    std::fs::write(&path, data).map_err(|e| RagError::VectorStore {
        backend: "disk".into(),
        message: format!("failed to write {}: {e}", path.display()),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_handles_zero_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let sim = cosine_similarity(&[0.6, 0.8], &[0.6, 0.8]);
        assert!((sim - 1.0).abs() < 1e-6);
    }
}

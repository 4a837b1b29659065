//! Configuration for the RAG pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default Ollama endpoint for both chat and embedding calls.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Configuration parameters for the RAG pipeline.
///
/// Values are read once at construction; there is no dynamic reload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Path to the source document to index.
    pub document_path: String,
    /// Directory where the vector store is persisted.
    pub store_dir: String,
    /// Base URL of the Ollama server.
    pub base_url: String,
    /// Chat model used for answering and judging.
    pub model: String,
    /// Model used to embed chunks and queries.
    pub embedding_model: String,
    /// Maximum chunk size in tokens under `encoding`.
    pub chunk_size: usize,
    /// Number of overlapping tokens between consecutive chunks.
    pub chunk_overlap: usize,
    /// Tiktoken encoding name used for token counting.
    pub encoding: String,
    /// Number of top results to retrieve from vector search.
    pub top_k: usize,
    /// Default maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Default generation temperature.
    pub temperature: f32,
    /// Default nucleus-sampling parameter.
    pub top_p: f32,
    /// Default top-k sampling parameter.
    pub top_k_sampling: u32,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            document_path: "HBR_How_Apple_Is_Organized_For_Innovation.pdf".to_string(),
            store_dir: "vector_db_1024".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "qwen3:4b-instruct".to_string(),
            embedding_model: "mxbai-embed-large".to_string(),
            chunk_size: 1024,
            chunk_overlap: 20,
            encoding: "cl100k_base".to_string(),
            top_k: 3,
            max_tokens: 1024,
            temperature: 0.1,
            top_p: 0.9,
            top_k_sampling: 40,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the path to the source document.
    pub fn document_path(mut self, path: impl Into<String>) -> Self {
        self.config.document_path = path.into();
        self
    }

    /// Set the directory where the vector store is persisted.
    pub fn store_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.store_dir = dir.into();
        self
    }

    /// Set the base URL of the Ollama server.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the chat model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the embedding model name.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    /// Set the maximum chunk size in tokens.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in tokens.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the tiktoken encoding name used for token counting.
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.config.encoding = encoding.into();
        self
    }

    /// Set the number of top results to retrieve from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the default maximum number of tokens to generate.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set the default generation temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the default nucleus-sampling parameter.
    pub fn top_p(mut self, top_p: f32) -> Self {
        self.config.top_p = top_p;
        self
    }

    /// Set the default top-k sampling parameter.
    pub fn top_k_sampling(mut self, top_k: u32) -> Self {
        self.config.top_k_sampling = top_k;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    pub fn build(self) -> Result<RagConfig> {
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        if self.config.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        Ok(self.config)
    }
}

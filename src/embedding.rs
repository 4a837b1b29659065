//! Embedding provider trait and the Ollama-backed implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// The default [`embed_batch`](EmbeddingProvider::embed_batch)
/// implementation calls [`embed`](EmbeddingProvider::embed) sequentially;
/// backends with native batching should override it.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    ///
    /// Deterministic for a fixed model version and input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}

/// An [`EmbeddingProvider`] backed by an Ollama server.
///
/// Uses the `/api/embeddings` endpoint with a named embedding model.
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbeddingProvider {
    /// Connect to an Ollama server and verify the named model loads.
    ///
    /// Issues a probe embedding so that a missing or broken model is a
    /// fatal initialization error, distinct from per-call failures. The
    /// probe also fixes the dimensionality reported by
    /// [`dimensions()`](EmbeddingProvider::dimensions).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] if the server is unreachable or the
    /// model cannot produce an embedding.
    pub async fn connect(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let mut provider = Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            dimensions: 0,
        };

        let probe = provider.embed("warmup").await.map_err(|e| {
            error!(model = %provider.model, error = %e, "embedding model failed to initialize");
            RagError::Embedding {
                provider: "Ollama".into(),
                message: format!("model '{}' failed to initialize: {e}", provider.model),
            }
        })?;
        provider.dimensions = probe.len();

        debug!(model = %provider.model, dimensions = provider.dimensions, "embedding model ready");
        Ok(provider)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbeddingRequest { model: &self.model, prompt: text };

        let response = self.client.post(&url).json(&request).send().await.map_err(|e| {
            error!(provider = "Ollama", error = %e, "embedding request failed");
            RagError::Embedding {
                provider: "Ollama".into(),
                message: format!("request failed: {e}"),
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = "Ollama", %status, "embedding API error");
            return Err(RagError::Embedding {
                provider: "Ollama".into(),
                message: format!("API returned {status}: {body}"),
            });
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = "Ollama", error = %e, "failed to parse embedding response");
            RagError::Embedding {
                provider: "Ollama".into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        Ok(parsed.embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

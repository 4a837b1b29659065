//! # ragjudge
//!
//! Retrieval-augmented question answering with LLM-as-judge evaluation.
//!
//! The crate indexes a source document into a persisted vector store, then
//! answers questions strictly from retrieved context and scores each answer
//! on groundedness and relevance using the same model in a judge role.
//!
//! ## Overview
//!
//! - [`RagPipeline`] — the orchestrator; advances through an explicit
//!   setup state machine and exposes `answer` / `rate` / `answer_and_rate`
//! - [`TokenChunker`] — token-budget recursive splitting under a tiktoken
//!   encoding
//! - [`EmbeddingProvider`] / [`OllamaEmbeddingProvider`] — text-to-vector
//!   mapping
//! - [`DiskVectorStore`] — open-if-present, build-otherwise persistence
//!   with cosine-similarity search
//! - [`ChatModel`] / [`OllamaChatModel`] — chat-completion transport
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ragjudge::{GenerationOptions, OllamaChatModel, RagConfig, RagPipeline};
//!
//! # async fn run() {
//! let config = RagConfig::default();
//! let model = Arc::new(OllamaChatModel::new(&config.base_url, &config.model));
//! let mut pipeline = RagPipeline::new(config, model);
//!
//! pipeline.load_data();
//! pipeline.chunk_data();
//! pipeline.create_embeddings().await;
//! pipeline.setup_vector_database().await;
//!
//! let k = pipeline.config().top_k;
//! let options = GenerationOptions::from_config(pipeline.config());
//! let result = pipeline.answer_and_rate("How is Apple organized?", k, &options).await;
//! println!("{}\n{}\n{}", result.answer, result.groundedness, result.relevance);
//! # }
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod prompts;
pub mod store;

pub use chunking::TokenChunker;
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Page, SearchResult};
pub use embedding::{EmbeddingProvider, OllamaEmbeddingProvider};
pub use error::{RagError, Result};
pub use loader::load_document;
pub use model::{ChatMessage, ChatModel, GenerationOptions, OllamaChatModel, Role};
pub use pipeline::{AnswerRating, EvalKind, PipelineState, RagPipeline};
pub use store::{DiskVectorStore, StoreEntry, VectorStore};

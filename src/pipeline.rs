//! RAG pipeline orchestrator.
//!
//! [`RagPipeline`] composes ingestion, chunking, embedding, the persisted
//! vector store, and the chat model into an answer-generation flow and two
//! LLM-as-judge evaluation flows (groundedness and relevance).
//!
//! The pipeline advances through an explicit state machine:
//! `Uninitialized → DataLoaded → Chunked → EmbeddingReady → StoreReady`,
//! one transition per setup call. Invoking a later-stage operation before
//! its precondition is met logs the missing precondition and returns a
//! sentinel instead of proceeding with partial state. Nothing in this
//! module is designed to crash a batch: every failure is absorbed at the
//! boundary nearest its cause and surfaces as data.

use std::sync::Arc;

use tracing::{info, warn};

use crate::chunking::TokenChunker;
use crate::config::RagConfig;
use crate::document::{Chunk, Page};
use crate::embedding::{EmbeddingProvider, OllamaEmbeddingProvider};
use crate::model::{ChatMessage, ChatModel, GenerationOptions};
use crate::prompts;
use crate::store::{DiskVectorStore, VectorStore};

/// Separator used when concatenating retrieved chunk texts.
const CONTEXT_SEPARATOR: &str = ". ";

/// The setup stage a [`RagPipeline`] has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No document loaded yet.
    Uninitialized,
    /// Pages are loaded.
    DataLoaded,
    /// Pages are chunked.
    Chunked,
    /// An embedding provider is attached.
    EmbeddingReady,
    /// The vector store is built or opened; answering is available.
    StoreReady,
}

/// Which quality dimension an LLM judge is asked to score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalKind {
    /// Is the answer derived solely from the retrieved context?
    Groundedness,
    /// Does the answer address the important aspects of the question?
    Relevance,
}

impl EvalKind {
    /// The rater system message for this dimension.
    fn system_message(self) -> &'static str {
        match self {
            EvalKind::Groundedness => prompts::GROUNDEDNESS_RATER_SYSTEM_MESSAGE,
            EvalKind::Relevance => prompts::RELEVANCE_RATER_SYSTEM_MESSAGE,
        }
    }

    /// Display label used in sentinel strings and logs.
    fn label(self) -> &'static str {
        match self {
            EvalKind::Groundedness => "Groundedness",
            EvalKind::Relevance => "Relevance",
        }
    }
}

/// An answer together with its two judge ratings.
///
/// Ratings are opaque free-text judgments; the rubric embedded in the rater
/// system message asks for a 1-5 score in prose, but no numeric value is
/// parsed out.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRating {
    /// The generated answer (or a flattened error string).
    pub answer: String,
    /// The groundedness judgment.
    pub groundedness: String,
    /// The relevance judgment.
    pub relevance: String,
}

/// Orchestrates document indexing, retrieval, answering, and judging.
///
/// One pipeline instance owns one chat-model handle and, once
/// [`setup_vector_database`](RagPipeline::setup_vector_database) has run,
/// exclusive use of one store directory. All operations execute strictly
/// in sequence; there is no parallelism and no early exit.
pub struct RagPipeline {
    config: RagConfig,
    model: Arc<dyn ChatModel>,
    pages: Option<Vec<Page>>,
    chunks: Option<Vec<Chunk>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Box<dyn VectorStore>>,
}

impl RagPipeline {
    /// Create an uninitialized pipeline owning the given chat model.
    pub fn new(config: RagConfig, model: Arc<dyn ChatModel>) -> Self {
        Self { config, model, pages: None, chunks: None, embedder: None, store: None }
    }

    /// Return the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// The setup stage this pipeline has reached.
    pub fn state(&self) -> PipelineState {
        if self.store.is_some() {
            PipelineState::StoreReady
        } else if self.embedder.is_some() {
            PipelineState::EmbeddingReady
        } else if self.chunks.is_some() {
            PipelineState::Chunked
        } else if self.pages.is_some() {
            PipelineState::DataLoaded
        } else {
            PipelineState::Uninitialized
        }
    }

    /// Load the configured source document into pages.
    ///
    /// Returns `false` (leaving the state untouched) if the document cannot
    /// be read; the cause is logged, never raised.
    pub fn load_data(&mut self) -> bool {
        match crate::loader::load_document(&self.config.document_path) {
            Ok(pages) => {
                info!(page_count = pages.len(), "data loaded");
                self.pages = Some(pages);
                true
            }
            Err(e) => {
                warn!(path = %self.config.document_path, error = %e, "failed to load data");
                false
            }
        }
    }

    /// Chunk the loaded pages under the configured token budget.
    ///
    /// No-op (with a logged warning) if no data is loaded or the chunker
    /// cannot be constructed.
    pub fn chunk_data(&mut self) -> bool {
        let Some(pages) = &self.pages else {
            warn!("no data loaded; call load_data first");
            return false;
        };

        let chunker = match TokenChunker::new(
            self.config.chunk_size,
            self.config.chunk_overlap,
            &self.config.encoding,
        ) {
            Ok(chunker) => chunker,
            Err(e) => {
                warn!(error = %e, "failed to construct chunker");
                return false;
            }
        };

        let chunks = chunker.chunk_pages(pages);
        info!(chunk_count = chunks.len(), "data chunked");
        self.chunks = Some(chunks);
        true
    }

    /// Connect the configured Ollama embedding model.
    ///
    /// A model that fails to initialize is reported here, before any store
    /// build is attempted. No-op if the data has not been chunked.
    pub async fn create_embeddings(&mut self) -> bool {
        let provider = match OllamaEmbeddingProvider::connect(
            self.config.base_url.clone(),
            self.config.embedding_model.clone(),
        )
        .await
        {
            Ok(provider) => provider,
            Err(e) => {
                warn!(error = %e, "failed to initialize embedding model");
                return false;
            }
        };

        self.create_embeddings_with(Arc::new(provider))
    }

    /// Attach an already-constructed embedding provider.
    ///
    /// No-op (with a logged warning) if the data has not been chunked.
    pub fn create_embeddings_with(&mut self, provider: Arc<dyn EmbeddingProvider>) -> bool {
        if self.chunks.is_none() {
            warn!("no chunks available; call chunk_data first");
            return false;
        }
        info!(dimensions = provider.dimensions(), "embedding provider ready");
        self.embedder = Some(provider);
        true
    }

    /// Open or build the persisted vector store in the configured directory.
    ///
    /// If the directory already holds data it is loaded as-is and the
    /// in-memory chunks are ignored. No-op if the embedding provider is not
    /// ready or no chunks are available.
    pub async fn setup_vector_database(&mut self) -> bool {
        let Some(embedder) = &self.embedder else {
            warn!("embedding provider not initialized; call create_embeddings first");
            return false;
        };
        let Some(chunks) = &self.chunks else {
            warn!("no chunks available; call chunk_data first");
            return false;
        };

        match DiskVectorStore::open_or_build(&self.config.store_dir, chunks, embedder.as_ref())
            .await
        {
            Ok(store) => {
                info!(entry_count = store.len(), "vector store ready");
                self.store = Some(Box::new(store));
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to set up vector store");
                false
            }
        }
    }

    /// Retrieve the top-`k` chunks for a question, joined with `". "` in
    /// similarity-descending order.
    ///
    /// Returns an empty string — not a failure — when the store is not
    /// ready or retrieval errs; downstream flows treat this as
    /// "no context."
    pub async fn get_context(&self, question: &str, k: usize) -> String {
        let Some(store) = &self.store else {
            warn!("vector store not ready; call setup_vector_database first");
            return String::new();
        };
        // StoreReady implies an attached embedder.
        let Some(embedder) = &self.embedder else {
            warn!("embedding provider missing");
            return String::new();
        };

        let query_embedding = match embedder.embed(question).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "failed to embed query");
                return String::new();
            }
        };

        let results = store.search(&query_embedding, k);
        info!(result_count = results.len(), k, "retrieved context");

        results
            .iter()
            .map(|r| r.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }

    /// Build the answer prompt for a question.
    ///
    /// With context available the prompt pairs the strict Q&A system
    /// message with the interpolated user template. When retrieval yields
    /// nothing, the prompt degrades to the bare question with no system
    /// instruction — an intentional fallback, not an error.
    pub async fn build_answer_prompt(&self, question: &str, k: usize) -> Vec<ChatMessage> {
        let context = self.get_context(question, k).await;
        if context.is_empty() {
            warn!("could not retrieve context; falling back to a bare prompt");
            return vec![ChatMessage::user(question)];
        }

        let user_message = prompts::render(
            prompts::QNA_USER_MESSAGE_TEMPLATE,
            &[("context", &context), ("question", question)],
        );

        vec![ChatMessage::system(prompts::QNA_SYSTEM_MESSAGE), ChatMessage::user(user_message)]
    }

    /// Answer a question using retrieved context.
    ///
    /// Always returns a string: a model failure is flattened into a
    /// human-readable error message so a batch of questions never aborts.
    pub async fn answer(&self, question: &str, k: usize, options: &GenerationOptions) -> String {
        let prompt = self.build_answer_prompt(question, k).await;
        self.flatten_chat(&prompt, options).await
    }

    /// Build the evaluation prompt for one judge dimension.
    ///
    /// Context is re-retrieved for the question rather than reusing the
    /// context that produced the answer. Returns `None` — "evaluation
    /// skipped" — when retrieval yields nothing.
    pub async fn build_eval_prompt(
        &self,
        kind: EvalKind,
        question: &str,
        answer: &str,
        k: usize,
    ) -> Option<Vec<ChatMessage>> {
        let context = self.get_context(question, k).await;
        if context.is_empty() {
            warn!(kind = kind.label(), "could not retrieve context for evaluation");
            return None;
        }

        let user_message = prompts::render(
            prompts::EVAL_USER_MESSAGE_TEMPLATE,
            &[("question", question), ("context", &context), ("answer", answer)],
        );

        Some(vec![ChatMessage::system(kind.system_message()), ChatMessage::user(user_message)])
    }

    /// Rate an answer on one dimension with the LLM as judge.
    ///
    /// Judgments use a tight token budget and near-zero temperature to
    /// favor consistent scores. Returns the fixed
    /// `"... evaluation failed: context not found."` sentinel when and only
    /// when context retrieval yields nothing.
    pub async fn rate(&self, kind: EvalKind, question: &str, answer: &str, k: usize) -> String {
        info!(kind = kind.label(), "rating answer");
        let Some(prompt) = self.build_eval_prompt(kind, question, answer, k).await else {
            return format!("{} evaluation failed: context not found.", kind.label());
        };

        let options = GenerationOptions {
            max_tokens: 200,
            temperature: 0.1,
            ..GenerationOptions::from_config(&self.config)
        };
        self.flatten_chat(&prompt, &options).await
    }

    /// Answer a question, then rate the answer on both dimensions.
    ///
    /// The three calls run strictly in sequence and each failure is
    /// reported in its own field; one failed rating does not skip the
    /// other.
    pub async fn answer_and_rate(
        &self,
        question: &str,
        k: usize,
        options: &GenerationOptions,
    ) -> AnswerRating {
        let answer = self.answer(question, k, options).await;
        let groundedness = self.rate(EvalKind::Groundedness, question, &answer, k).await;
        let relevance = self.rate(EvalKind::Relevance, question, &answer, k).await;
        AnswerRating { answer, groundedness, relevance }
    }

    /// Call the chat model and flatten a failure into a display string.
    async fn flatten_chat(&self, prompt: &[ChatMessage], options: &GenerationOptions) -> String {
        match self.model.chat(prompt, options).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "chat call failed");
                format!("Sorry, I encountered the following error while generating LLM response: \n {e}")
            }
        }
    }
}

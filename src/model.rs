//! Chat model trait and the Ollama chat client.
//!
//! [`ChatModel::chat`] returns a tagged result: model output and transport
//! failures are structurally distinct at this seam. The pipeline decides at
//! its own boundary whether to flatten a failure into a display string.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::RagConfig;
use crate::error::{RagError, Result};

/// The role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A system instruction.
    System,
    /// End-user input.
    User,
    /// A prior model reply.
    Assistant,
}

/// A single role-tagged message in a chat prompt.
///
/// Prompts are ordered message sequences, constructed fresh per request
/// and never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The author role.
    pub role: Role,
    /// The message text.
    pub content: String,
}

impl ChatMessage {
    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// Sampling parameters for a single generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus-sampling parameter.
    pub top_p: f32,
    /// Top-k sampling parameter.
    pub top_k: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self { max_tokens: 1024, temperature: 0.1, top_p: 0.9, top_k: 40 }
    }
}

impl GenerationOptions {
    /// Derive generation defaults from a pipeline configuration.
    pub fn from_config(config: &RagConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k_sampling,
        }
    }
}

/// A language model reachable through a chat-completion interface.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send an ordered message list and return the generated text.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Model`] on any transport or API failure. The
    /// failure is never encoded as response text at this layer.
    async fn chat(&self, messages: &[ChatMessage], options: &GenerationOptions) -> Result<String>;

    /// The model identifier used for this client.
    fn model_name(&self) -> &str;
}

/// A [`ChatModel`] backed by an Ollama server's `/api/chat` endpoint.
pub struct OllamaChatModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OllamaChatModel {
    /// Create a client for the given server and model name.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into(), model: model.into() }
    }
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    async fn chat(&self, messages: &[ChatMessage], options: &GenerationOptions) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: OllamaOptions {
                num_predict: options.max_tokens,
                temperature: options.temperature,
                top_p: options.top_p,
                top_k: options.top_k,
            },
        };

        debug!(model = %self.model, message_count = messages.len(), "sending chat request");

        let response = self.client.post(&url).json(&request).send().await.map_err(|e| {
            error!(model = %self.model, error = %e, "chat request failed");
            RagError::Model { model: self.model.clone(), message: format!("request failed: {e}") }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(model = %self.model, %status, "chat API error");
            return Err(RagError::Model {
                model: self.model.clone(),
                message: format!("API returned {status}: {body}"),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(model = %self.model, error = %e, "failed to parse chat response");
            RagError::Model {
                model: self.model.clone(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        Ok(parsed.message.content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let msg = ChatMessage::system("be brief");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"be brief"}"#);
    }

    #[test]
    fn options_default_to_config_values() {
        let config = RagConfig::default();
        let options = GenerationOptions::from_config(&config);
        assert_eq!(options, GenerationOptions::default());
    }
}

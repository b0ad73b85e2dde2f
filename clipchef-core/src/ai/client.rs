//! Content-understanding service trait.

use async_trait::async_trait;
use thiserror::Error;

use super::types::{ChatRequest, ChatResponse, MediaInput, SpeechAudio};
use crate::config::ConfigError;
use crate::error::FetchError;
use crate::types::RecipeDraft;

#[derive(Error, Debug)]
pub enum AiError {
    #[error("API error: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] FetchError),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Model returned no content")]
    EmptyResponse,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Everything the pipeline asks of the content-understanding service.
///
/// Implementations are stateless per call; callers own timeouts and retries.
#[async_trait]
pub trait ContentService: Send + Sync {
    /// Turn a video (by URL or inline bytes) into a structured recipe draft.
    ///
    /// `auxiliary` is extra context such as the platform's post description.
    async fn understand(
        &self,
        media: MediaInput,
        auxiliary: Option<&str>,
    ) -> Result<RecipeDraft, AiError>;

    /// Compute a semantic embedding for `text`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError>;

    /// Synthesize spoken audio for `text`.
    async fn synthesize_speech(&self, text: &str) -> Result<SpeechAudio, AiError>;

    /// Complete a text-only chat request.
    ///
    /// The `prompt_name` identifies the prompt in logs.
    async fn complete(
        &self,
        prompt_name: &str,
        request: ChatRequest,
    ) -> Result<ChatResponse, AiError>;
}

//! Fake content service for testing.
//!
//! Returns deterministic drafts, embeddings and audio without network access.
//! Individual capabilities can be switched to fail so tests can exercise the
//! pipeline's fallback and degradation paths.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::client::{AiError, ContentService};
use super::types::{ChatRequest, ChatResponse, MediaInput, SpeechAudio, Usage};
use super::wav::{pcm16_to_wav, TTS_SAMPLE_RATE};
use crate::types::{Difficulty, Ingredient, RecipeDraft};

/// A recorded call to [`FakeContentService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    UnderstandRemote { url: String, auxiliary: Option<String> },
    UnderstandInline { mime_type: String, size: usize, auxiliary: Option<String> },
    Embed(String),
    Speech(String),
    Complete(String),
}

pub struct FakeContentService {
    draft: RecipeDraft,
    fail_remote: bool,
    fail_inline: bool,
    fail_embedding: bool,
    empty_embedding: bool,
    fail_speech: bool,
    /// Prompt name -> response content
    completions: HashMap<String, String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<FakeCall>>,
}

impl Default for FakeContentService {
    fn default() -> Self {
        Self::new(Self::sample_draft())
    }
}

impl FakeContentService {
    pub fn new(draft: RecipeDraft) -> Self {
        Self {
            draft,
            fail_remote: false,
            fail_inline: false,
            fail_embedding: false,
            empty_embedding: false,
            fail_speech: false,
            completions: HashMap::new(),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A small, valid recipe with a step-zero summary.
    pub fn sample_draft() -> RecipeDraft {
        RecipeDraft {
            title: "Pasta v1".to_string(),
            description: "Weeknight tomato pasta".to_string(),
            ingredients: vec![
                Ingredient {
                    name: "spaghetti".to_string(),
                    amount: Some("200".to_string()),
                    unit: Some("g".to_string()),
                },
                Ingredient::named("tomato"),
            ],
            instructions: vec!["Boil the pasta".to_string(), "Add the sauce".to_string()],
            difficulty: Some(Difficulty::Easy),
            cooking_time_minutes: Some(20),
            step_zero_summary: Some("A quick tomato pasta for busy nights.".to_string()),
            thumbnail_ref: None,
        }
    }

    /// Direct (URL) understanding fails.
    pub fn fail_remote(mut self) -> Self {
        self.fail_remote = true;
        self
    }

    /// Understanding of downloaded bytes fails.
    pub fn fail_inline(mut self) -> Self {
        self.fail_inline = true;
        self
    }

    pub fn fail_embedding(mut self) -> Self {
        self.fail_embedding = true;
        self
    }

    /// Embedding succeeds but returns no values.
    pub fn empty_embedding(mut self) -> Self {
        self.empty_embedding = true;
        self
    }

    pub fn fail_speech(mut self) -> Self {
        self.fail_speech = true;
        self
    }

    /// Register the response content for a named prompt.
    pub fn with_completion(mut self, prompt_name: &str, content: &str) -> Self {
        self.completions
            .insert(prompt_name.to_string(), content.to_string());
        self
    }

    /// Sleep before answering `understand`, for timeout tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: FakeCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

#[async_trait]
impl ContentService for FakeContentService {
    async fn understand(
        &self,
        media: MediaInput,
        auxiliary: Option<&str>,
    ) -> Result<RecipeDraft, AiError> {
        let auxiliary = auxiliary.map(str::to_string);
        let failed = match media {
            MediaInput::Remote { url } => {
                self.record(FakeCall::UnderstandRemote { url, auxiliary });
                self.fail_remote
            }
            MediaInput::Inline { data, mime_type } => {
                self.record(FakeCall::UnderstandInline {
                    mime_type,
                    size: data.len(),
                    auxiliary,
                });
                self.fail_inline
            }
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if failed {
            return Err(AiError::Api("fake understanding failure".to_string()));
        }
        Ok(self.draft.clone())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        self.record(FakeCall::Embed(text.to_string()));
        if self.fail_embedding {
            return Err(AiError::Api("fake embedding failure".to_string()));
        }
        if self.empty_embedding {
            return Ok(Vec::new());
        }
        // Stable, text-dependent values.
        let len = text.len() as f32;
        Ok(vec![0.1, 0.2, len / 1000.0])
    }

    async fn synthesize_speech(&self, text: &str) -> Result<SpeechAudio, AiError> {
        self.record(FakeCall::Speech(text.to_string()));
        if self.fail_speech {
            return Err(AiError::Api("fake speech failure".to_string()));
        }
        Ok(SpeechAudio {
            data: pcm16_to_wav(&[0u8; 48], TTS_SAMPLE_RATE, 1),
            content_type: "audio/wav".to_string(),
        })
    }

    async fn complete(
        &self,
        prompt_name: &str,
        _request: ChatRequest,
    ) -> Result<ChatResponse, AiError> {
        self.record(FakeCall::Complete(prompt_name.to_string()));
        let content = self
            .completions
            .get(prompt_name)
            .cloned()
            .ok_or_else(|| AiError::Api(format!("no fake completion for {}", prompt_name)))?;
        Ok(ChatResponse {
            content,
            usage: Usage::default(),
        })
    }
}

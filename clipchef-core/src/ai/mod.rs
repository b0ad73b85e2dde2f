//! Content-understanding service integration.
//!
//! This module provides:
//! - `ContentService` trait for video understanding, embeddings, speech and
//!   text completions
//! - `GeminiContentService` talking to the Gemini REST API
//! - `FakeContentService` for tests
//! - Prompt templates and their response parsers
//!
//! # Configuration
//!
//! - `GEMINI_API_KEY` (required)
//! - `CLIPCHEF_AI_MODEL` (optional): understanding and completion model
//! - `CLIPCHEF_AI_EMBEDDING_MODEL` (optional)
//! - `CLIPCHEF_AI_TTS_MODEL` / `CLIPCHEF_AI_TTS_VOICE` (optional)
//! - `CLIPCHEF_AI_BASE_URL` (optional): API base URL
//! - `CLIPCHEF_AI_RATE_LIMIT_MS` (optional): Delay between requests in ms
//!
//! # Example
//!
//! ```ignore
//! use clipchef_core::ai::{ContentService, GeminiContentService, MediaInput};
//!
//! let service = GeminiContentService::from_env()?;
//! let draft = service
//!     .understand(MediaInput::Remote { url: "https://youtu.be/abc".into() }, None)
//!     .await?;
//! println!("{}", draft.title);
//! ```

mod client;
mod config;
mod fake;
mod gemini;
pub mod prompts;
mod types;
pub mod wav;

pub use client::{AiError, ContentService};
pub use config::AiConfig;
pub use fake::{FakeCall, FakeContentService};
pub use gemini::GeminiContentService;
pub use types::{ChatMessage, ChatRequest, ChatResponse, MediaInput, Role, SpeechAudio, Usage};

//! AI configuration from environment variables.

use std::time::Duration;

use crate::config::{self, ConfigError};

/// Default Gemini REST base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model for video understanding and text completions.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";

pub const DEFAULT_TTS_VOICE: &str = "Kore";

/// Per-request upper bound; video understanding can take a while.
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// AI client configuration.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: String,
    /// Model used for understanding and completions (e.g., "gemini-2.5-flash").
    pub model: String,
    pub embedding_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub base_url: String,
    pub timeout: Duration,
    /// Milliseconds to wait between requests. 0 disables.
    pub rate_limit_ms: u64,
}

impl AiConfig {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `GEMINI_API_KEY`
    ///
    /// Optional:
    /// - `CLIPCHEF_AI_MODEL` (default: "gemini-2.5-flash")
    /// - `CLIPCHEF_AI_EMBEDDING_MODEL` (default: "text-embedding-004")
    /// - `CLIPCHEF_AI_TTS_MODEL` (default: "gemini-2.5-flash-preview-tts")
    /// - `CLIPCHEF_AI_TTS_VOICE` (default: "Kore")
    /// - `CLIPCHEF_AI_BASE_URL`
    /// - `CLIPCHEF_EXTRACT_TIMEOUT_SECS` (default: 180)
    /// - `CLIPCHEF_AI_RATE_LIMIT_MS` (default: 0)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: config::required("GEMINI_API_KEY")?,
            model: config::string_or("CLIPCHEF_AI_MODEL", DEFAULT_MODEL),
            embedding_model: config::string_or(
                "CLIPCHEF_AI_EMBEDDING_MODEL",
                DEFAULT_EMBEDDING_MODEL,
            ),
            tts_model: config::string_or("CLIPCHEF_AI_TTS_MODEL", DEFAULT_TTS_MODEL),
            tts_voice: config::string_or("CLIPCHEF_AI_TTS_VOICE", DEFAULT_TTS_VOICE),
            base_url: config::string_or("CLIPCHEF_AI_BASE_URL", DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            timeout: config::secs_or("CLIPCHEF_EXTRACT_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            rate_limit_ms: config::parse_or("CLIPCHEF_AI_RATE_LIMIT_MS", 0)?,
        })
    }

    /// Configuration pointing at an arbitrary base URL, used with a mock HTTP client.
    pub fn for_base_url(base_url: &str, api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            tts_voice: DEFAULT_TTS_VOICE.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            rate_limit_ms: 0,
        }
    }
}

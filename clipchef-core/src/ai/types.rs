//! Request and response shapes shared by content-service implementations.

use serde::{Deserialize, Serialize};

/// Speaker of a prompt turn. System turns become the system instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Model,
}

impl Role {
    /// Role name in a `contents` entry; `None` for system turns.
    pub fn content_role(&self) -> Option<&'static str> {
        match self {
            Role::System => None,
            Role::User => Some("user"),
            Role::Model => Some("model"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A text-only generation request (used for preparation guides).
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Ask for `application/json` output.
    #[serde(skip)]
    pub json_response: bool,
}

/// Token accounting reported by the service, zero when absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub usage: Usage,
}

/// Media handed to content understanding: either a URL the service can
/// read itself, or the bytes of a downloaded file.
#[derive(Debug, Clone)]
pub enum MediaInput {
    Remote { url: String },
    Inline { data: Vec<u8>, mime_type: String },
}

impl MediaInput {
    pub fn describe(&self) -> String {
        match self {
            MediaInput::Remote { url } => format!("remote {}", url),
            MediaInput::Inline { data, mime_type } => {
                format!("inline {} ({} bytes)", mime_type, data.len())
            }
        }
    }
}

/// Synthesized narration audio.
#[derive(Debug, Clone)]
pub struct SpeechAudio {
    pub data: Vec<u8>,
    pub content_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_turns_have_no_content_role() {
        assert_eq!(Role::System.content_role(), None);
        assert_eq!(Role::Model.content_role(), Some("model"));
        assert_eq!(ChatMessage::user("hi").role.content_role(), Some("user"));
    }
}

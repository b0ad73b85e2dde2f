//! Gemini REST implementation of [`ContentService`].

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

use super::client::{AiError, ContentService};
use super::config::AiConfig;
use super::prompts::{parse_draft_response, render_extract_prompt, EXTRACT_RECIPE_PROMPT_NAME};
use super::types::{ChatRequest, ChatResponse, MediaInput, Role, SpeechAudio, Usage};
use super::wav::{pcm16_to_wav, TTS_SAMPLE_RATE};
use crate::http::{HttpClient, HttpClientBuilder};
use crate::types::RecipeDraft;

/// Content service backed by Google's Generative Language API.
pub struct GeminiContentService {
    client: Arc<dyn HttpClient>,
    config: AiConfig,
}

impl GeminiContentService {
    /// Create a new service from environment configuration.
    pub fn from_env() -> Result<Self, AiError> {
        let config = AiConfig::from_env()?;
        let client = HttpClientBuilder::new()
            .rate_limit_ms(config.rate_limit_ms)
            .timeout(config.timeout)
            .build()
            .map_err(|e| AiError::Api(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::new(Arc::new(client), config))
    }

    pub fn new(client: Arc<dyn HttpClient>, config: AiConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.config.base_url, model, method)
    }

    async fn generate(&self, model: &str, body: JsonValue) -> Result<JsonValue, AiError> {
        let url = self.endpoint(model, "generateContent");
        let headers = [("x-goog-api-key", self.config.api_key.as_str())];
        let response = self.client.post_json(&url, &headers, &body).await?;

        if let Some(message) = response
            .pointer("/promptFeedback/blockReason")
            .and_then(JsonValue::as_str)
        {
            return Err(AiError::Api(format!("Prompt blocked: {}", message)));
        }
        Ok(response)
    }

    fn media_part(media: &MediaInput) -> JsonValue {
        match media {
            MediaInput::Remote { url } => json!({
                "file_data": { "mime_type": "video/*", "file_uri": url }
            }),
            MediaInput::Inline { data, mime_type } => json!({
                "inline_data": { "mime_type": mime_type, "data": BASE64.encode(data) }
            }),
        }
    }
}

/// Concatenate the text parts of the first candidate.
fn response_text(response: &JsonValue) -> Result<String, AiError> {
    let parts = response
        .pointer("/candidates/0/content/parts")
        .and_then(JsonValue::as_array)
        .ok_or(AiError::EmptyResponse)?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(JsonValue::as_str))
        .collect();

    if text.trim().is_empty() {
        return Err(AiError::EmptyResponse);
    }
    Ok(text)
}

fn response_usage(response: &JsonValue) -> Usage {
    let count = |field: &str| {
        response
            .pointer(&format!("/usageMetadata/{}", field))
            .and_then(JsonValue::as_u64)
            .unwrap_or(0) as u32
    };
    Usage {
        prompt_tokens: count("promptTokenCount"),
        output_tokens: count("candidatesTokenCount"),
        total_tokens: count("totalTokenCount"),
    }
}

#[async_trait]
impl ContentService for GeminiContentService {
    async fn understand(
        &self,
        media: MediaInput,
        auxiliary: Option<&str>,
    ) -> Result<RecipeDraft, AiError> {
        tracing::debug!(
            prompt_name = EXTRACT_RECIPE_PROMPT_NAME,
            model = &self.config.model,
            media = %media.describe(),
            "Calling content understanding"
        );

        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    Self::media_part(&media),
                    { "text": render_extract_prompt(auxiliary) }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.2
            }
        });

        let response = self.generate(&self.config.model, body).await?;
        parse_draft_response(&response_text(&response)?)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        let url = self.endpoint(&self.config.embedding_model, "embedContent");
        let headers = [("x-goog-api-key", self.config.api_key.as_str())];
        let body = json!({
            "model": format!("models/{}", self.config.embedding_model),
            "content": { "parts": [{ "text": text }] }
        });

        let response = self.client.post_json(&url, &headers, &body).await?;
        let values = response
            .pointer("/embedding/values")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| AiError::ParseError("Missing embedding.values".to_string()))?;

        values
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| AiError::ParseError("Non-numeric embedding value".to_string()))
            })
            .collect()
    }

    async fn synthesize_speech(&self, text: &str) -> Result<SpeechAudio, AiError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": text }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": self.config.tts_voice }
                    }
                }
            }
        });

        let response = self.generate(&self.config.tts_model, body).await?;
        let encoded = response
            .pointer("/candidates/0/content/parts/0/inlineData/data")
            .and_then(JsonValue::as_str)
            .ok_or(AiError::EmptyResponse)?;
        let pcm = BASE64
            .decode(encoded)
            .map_err(|e| AiError::ParseError(format!("Invalid audio payload: {}", e)))?;

        if pcm.is_empty() {
            return Err(AiError::EmptyResponse);
        }

        Ok(SpeechAudio {
            data: pcm16_to_wav(&pcm, TTS_SAMPLE_RATE, 1),
            content_type: "audio/wav".to_string(),
        })
    }

    async fn complete(
        &self,
        prompt_name: &str,
        request: ChatRequest,
    ) -> Result<ChatResponse, AiError> {
        let system: Vec<JsonValue> = request
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| json!({ "text": m.content }))
            .collect();

        let contents: Vec<JsonValue> = request
            .messages
            .iter()
            .filter_map(|m| {
                let role = m.role.content_role()?;
                Some(json!({ "role": role, "parts": [{ "text": m.content }] }))
            })
            .collect();

        let mut generation_config = json!({});
        if let Some(max_tokens) = request.max_output_tokens {
            generation_config["maxOutputTokens"] = json!(max_tokens);
        }
        if let Some(temperature) = request.temperature {
            generation_config["temperature"] = json!(temperature);
        }
        if request.json_response {
            generation_config["responseMimeType"] = json!("application/json");
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": generation_config,
        });
        if !system.is_empty() {
            body["systemInstruction"] = json!({ "parts": system });
        }

        tracing::debug!(
            prompt_name = prompt_name,
            model = &self.config.model,
            "Calling AI API"
        );

        let response = self.generate(&self.config.model, body).await?;
        Ok(ChatResponse {
            content: response_text(&response)?,
            usage: response_usage(&response),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ChatMessage;
    use crate::http::MockClient;

    const BASE: &str = "https://ai.test/v1beta";

    fn service(client: MockClient) -> (Arc<MockClient>, GeminiContentService) {
        let client = Arc::new(client);
        let service = GeminiContentService::new(client.clone(), AiConfig::for_base_url(BASE, "k"));
        (client, service)
    }

    fn text_response(text: &str) -> JsonValue {
        json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }],
            "usageMetadata": { "promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15 }
        })
    }

    #[tokio::test]
    async fn test_understand_remote_video() {
        let draft_json = r#"{"title": "Pasta", "ingredients": [{"name": "spaghetti"}], "instructions": ["Boil"]}"#;
        let (client, service) = service(MockClient::new().with_json(
            &format!("{}/models/gemini-2.5-flash:generateContent", BASE),
            text_response(draft_json),
        ));

        let draft = service
            .understand(
                MediaInput::Remote {
                    url: "https://youtu.be/abc".to_string(),
                },
                Some("serves 2"),
            )
            .await
            .unwrap();
        assert_eq!(draft.title, "Pasta");

        let requests = client.requests();
        let body = requests[0].json.as_ref().unwrap();
        assert_eq!(
            body["contents"][0]["parts"][0]["file_data"]["file_uri"],
            "https://youtu.be/abc"
        );
        assert!(body["contents"][0]["parts"][1]["text"]
            .as_str()
            .unwrap()
            .contains("serves 2"));
        assert_eq!(requests[0].headers[0], ("x-goog-api-key".to_string(), "k".to_string()));
    }

    #[tokio::test]
    async fn test_understand_inline_is_base64() {
        let draft_json = r#"{"title": "Soup", "ingredients": [{"name": "water"}], "instructions": ["Heat"]}"#;
        let (client, service) = service(MockClient::new().with_json(
            &format!("{}/models/gemini-2.5-flash:generateContent", BASE),
            text_response(draft_json),
        ));

        service
            .understand(
                MediaInput::Inline {
                    data: b"abc".to_vec(),
                    mime_type: "video/mp4".to_string(),
                },
                None,
            )
            .await
            .unwrap();

        let body = client.requests()[0].json.clone().unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["inline_data"]["data"], "YWJj");
        assert_eq!(
            body["contents"][0]["parts"][0]["inline_data"]["mime_type"],
            "video/mp4"
        );
    }

    #[tokio::test]
    async fn test_embed_parses_values() {
        let (_, service) = service(MockClient::new().with_json(
            &format!("{}/models/text-embedding-004:embedContent", BASE),
            json!({ "embedding": { "values": [0.5, -0.25, 1.0] } }),
        ));

        let embedding = service.embed("Pasta").await.unwrap();
        assert_eq!(embedding, vec![0.5, -0.25, 1.0]);
    }

    #[tokio::test]
    async fn test_speech_is_wrapped_in_wav() {
        let pcm = vec![1u8; 96];
        let (_, service) = service(MockClient::new().with_json(
            &format!("{}/models/gemini-2.5-flash-preview-tts:generateContent", BASE),
            json!({
                "candidates": [{ "content": { "parts": [{
                    "inlineData": { "mimeType": "audio/L16;rate=24000", "data": BASE64.encode(&pcm) }
                }] } }]
            }),
        ));

        let audio = service.synthesize_speech("Hello").await.unwrap();
        assert_eq!(audio.content_type, "audio/wav");
        assert_eq!(&audio.data[0..4], b"RIFF");
        assert_eq!(audio.data.len(), 44 + 96);
    }

    #[tokio::test]
    async fn test_complete_maps_roles_and_usage() {
        let (client, service) = service(MockClient::new().with_json(
            &format!("{}/models/gemini-2.5-flash:generateContent", BASE),
            text_response("{\"ok\": true}"),
        ));

        let response = service
            .complete(
                "test",
                ChatRequest {
                    messages: vec![ChatMessage::system("be brief"), ChatMessage::user("hi")],
                    json_response: true,
                    max_output_tokens: Some(64),
                    temperature: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(response.content, "{\"ok\": true}");
        assert_eq!(response.usage.total_tokens, 15);

        let body = client.requests()[0].json.clone().unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 64);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[tokio::test]
    async fn test_empty_candidates_is_error() {
        let (_, service) = service(MockClient::new().with_json(
            &format!("{}/models/gemini-2.5-flash:generateContent", BASE),
            json!({ "candidates": [] }),
        ));

        let err = service
            .complete("test", ChatRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::EmptyResponse));
    }
}

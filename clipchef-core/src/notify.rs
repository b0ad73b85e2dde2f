//! Push notifications to a user's registered devices.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{self, ConfigError};
use crate::error::FetchError;
use crate::http::{HttpClient, HttpClientBuilder};

pub const DEFAULT_EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Push request failed: {0}")]
    Http(#[from] FetchError),

    #[error("Push rejected: {0}")]
    Rejected(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub recipe_id: Uuid,
}

impl PushMessage {
    /// The message sent when an ingestion finishes.
    pub fn recipe_ready(recipe_id: Uuid, recipe_title: &str) -> Self {
        Self {
            title: "Recipe ready".to_string(),
            body: recipe_title.to_string(),
            recipe_id,
        }
    }
}

/// Fire-and-forget delivery to one device token.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, token: &str, message: &PushMessage) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone)]
pub struct PushConfig {
    pub push_url: String,
    pub access_token: Option<String>,
}

impl PushConfig {
    /// Optional: `EXPO_PUSH_URL`, `EXPO_ACCESS_TOKEN`.
    pub fn from_env() -> Self {
        let token = config::string_or("EXPO_ACCESS_TOKEN", "");
        Self {
            push_url: config::string_or("EXPO_PUSH_URL", DEFAULT_EXPO_PUSH_URL),
            access_token: Some(token).filter(|t| !t.is_empty()),
        }
    }
}

/// Expo push API client.
pub struct ExpoPushNotifier {
    client: Arc<dyn HttpClient>,
    config: PushConfig,
}

impl ExpoPushNotifier {
    pub fn from_env() -> Result<Self, NotifyError> {
        let client = HttpClientBuilder::new()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(FetchError::from)?;
        Ok(Self::new(Arc::new(client), PushConfig::from_env()))
    }

    pub fn new(client: Arc<dyn HttpClient>, config: PushConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl Notifier for ExpoPushNotifier {
    async fn notify(&self, token: &str, message: &PushMessage) -> Result<(), NotifyError> {
        let body = json!({
            "to": token,
            "title": message.title,
            "body": message.body,
            "data": { "recipeId": message.recipe_id },
            "sound": "default",
        });

        let auth = self
            .config
            .access_token
            .as_ref()
            .map(|t| format!("Bearer {}", t));
        let headers: Vec<(&str, &str)> = auth
            .as_deref()
            .map(|a| vec![("Authorization", a)])
            .unwrap_or_default();

        let response = self
            .client
            .post_json(&self.config.push_url, &headers, &body)
            .await?;

        // Expo answers 200 with per-ticket errors.
        if response.pointer("/data/status").and_then(|s| s.as_str()) == Some("error") {
            let reason = response
                .pointer("/data/message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            return Err(NotifyError::Rejected(reason.to_string()));
        }
        Ok(())
    }
}

/// Records messages instead of sending them. Tokens in `failing` are rejected.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, PushMessage)>>,
    failing: Vec<String>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(tokens: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: tokens.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn sent(&self) -> Vec<(String, PushMessage)> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, token: &str, message: &PushMessage) -> Result<(), NotifyError> {
        if self.failing.iter().any(|t| t == token) {
            return Err(NotifyError::Rejected("DeviceNotRegistered".to_string()));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((token.to_string(), message.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockClient;

    const PUSH_URL: &str = "https://push.test/send";

    fn notifier(mock: MockClient, token: Option<&str>) -> (Arc<MockClient>, ExpoPushNotifier) {
        let mock = Arc::new(mock);
        let notifier = ExpoPushNotifier::new(
            mock.clone(),
            PushConfig {
                push_url: PUSH_URL.to_string(),
                access_token: token.map(str::to_string),
            },
        );
        (mock, notifier)
    }

    #[tokio::test]
    async fn test_sends_expo_payload() {
        let (mock, notifier) = notifier(
            MockClient::new().with_json(PUSH_URL, json!({ "data": { "status": "ok", "id": "t1" } })),
            Some("expo-secret"),
        );
        let recipe_id = Uuid::new_v4();

        notifier
            .notify("ExponentPushToken[abc]", &PushMessage::recipe_ready(recipe_id, "Pasta"))
            .await
            .unwrap();

        let request = &mock.requests()[0];
        let body = request.json.as_ref().unwrap();
        assert_eq!(body["to"], "ExponentPushToken[abc]");
        assert_eq!(body["title"], "Recipe ready");
        assert_eq!(body["body"], "Pasta");
        assert_eq!(body["data"]["recipeId"], recipe_id.to_string());
        assert_eq!(request.headers[0].1, "Bearer expo-secret");
    }

    #[tokio::test]
    async fn test_ticket_error_is_rejection() {
        let (mock, notifier) = notifier(
            MockClient::new().with_json(
                PUSH_URL,
                json!({ "data": { "status": "error", "message": "DeviceNotRegistered" } }),
            ),
            None,
        );

        let err = notifier
            .notify("tok", &PushMessage::recipe_ready(Uuid::new_v4(), "Pasta"))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Rejected(m) if m == "DeviceNotRegistered"));
        assert!(mock.requests()[0].headers.is_empty());
    }
}

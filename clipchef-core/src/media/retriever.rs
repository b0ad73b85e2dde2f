//! Video retrieval service client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::{ResolveError, TempMedia};
use crate::config::{self, ConfigError};
use crate::http::{HttpClient, HttpClientBuilder};
use crate::image::MAX_FILE_SIZE;

/// Upper bound for a downloaded video.
pub const MAX_VIDEO_BYTES: u64 = 100 * 1024 * 1024;

/// A video downloaded into a temp file, plus the platform metadata that came with it.
#[derive(Debug)]
pub struct FetchedMedia {
    pub file: TempMedia,
    pub mime_type: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub creator_username: Option<String>,
}

/// Downloads platform media. Implementations must not leave files behind on error.
#[async_trait]
pub trait VideoRetriever: Send + Sync {
    /// Download the video behind a social-media post URL.
    async fn fetch_media(&self, url: &str) -> Result<FetchedMedia, ResolveError>;

    /// Download a thumbnail image into a temp file.
    async fn fetch_thumbnail(&self, url: &str) -> Result<TempMedia, ResolveError>;
}

#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    pub api_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl RetrieverConfig {
    /// Required: `RETRIEVAL_API_URL`, `RETRIEVAL_API_KEY`.
    /// Optional: `CLIPCHEF_DOWNLOAD_TIMEOUT_SECS` (default: 120).
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: config::required("RETRIEVAL_API_URL")?
                .trim_end_matches('/')
                .to_string(),
            api_key: config::required("RETRIEVAL_API_KEY")?,
            timeout: config::secs_or(
                "CLIPCHEF_DOWNLOAD_TIMEOUT_SECS",
                super::DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            )?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    download_url: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    creator_username: Option<String>,
}

/// Client for the retrieval service's JSON API.
///
/// `POST {api_url}/v1/media {"url"}` answers with a short-lived download URL and
/// post metadata; the file is then streamed to disk.
pub struct RetrievalServiceClient {
    client: Arc<dyn HttpClient>,
    config: RetrieverConfig,
}

impl RetrievalServiceClient {
    pub fn from_env() -> Result<Self, ResolveError> {
        let config = RetrieverConfig::from_env()?;
        let client = HttpClientBuilder::new()
            .timeout(config.timeout)
            .rate_limit_ms(200)
            .build()
            .map_err(crate::error::FetchError::from)?;
        Ok(Self::new(Arc::new(client), config))
    }

    pub fn new(client: Arc<dyn HttpClient>, config: RetrieverConfig) -> Self {
        Self { client, config }
    }

    async fn download(&self, url: &str, suffix: &str, max_bytes: u64) -> Result<TempMedia, ResolveError> {
        let file = TempMedia::create(suffix)?;
        // On error `file` is dropped here and the partial download removed.
        self.client.download_to(url, file.path(), max_bytes).await?;
        Ok(file)
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "video/quicktime" => ".mov",
        "video/webm" => ".webm",
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/webp" => ".webp",
        _ => ".mp4",
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[async_trait]
impl VideoRetriever for RetrievalServiceClient {
    async fn fetch_media(&self, url: &str) -> Result<FetchedMedia, ResolveError> {
        let endpoint = format!("{}/v1/media", self.config.api_url);
        let auth = format!("Bearer {}", self.config.api_key);
        let response = self
            .client
            .post_json(&endpoint, &[("Authorization", auth.as_str())], &json!({ "url": url }))
            .await?;

        let media: MediaResponse = serde_json::from_value(response)
            .map_err(|e| ResolveError::InvalidResponse(e.to_string()))?;

        let mime_type = media
            .mime_type
            .filter(|m| m.starts_with("video/"))
            .unwrap_or_else(|| "video/mp4".to_string());

        let file = self
            .download(&media.download_url, extension_for(&mime_type), MAX_VIDEO_BYTES)
            .await?;

        Ok(FetchedMedia {
            file,
            mime_type,
            description: non_empty(media.description),
            thumbnail_url: non_empty(media.thumbnail_url),
            creator_username: non_empty(media.creator_username),
        })
    }

    async fn fetch_thumbnail(&self, url: &str) -> Result<TempMedia, ResolveError> {
        self.download(url, ".img", MAX_FILE_SIZE as u64).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockClient;

    fn config() -> RetrieverConfig {
        RetrieverConfig {
            api_url: "https://retrieve.test".to_string(),
            api_key: "secret".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_fetch_media_downloads_and_maps_metadata() {
        let mock = Arc::new(
            MockClient::new()
                .with_json(
                    "https://retrieve.test/v1/media",
                    json!({
                        "download_url": "https://cdn.test/v.mp4",
                        "mime_type": "video/mp4",
                        "description": "  Grandma's dumplings ",
                        "thumbnail_url": "",
                        "creator_username": "chef_anna"
                    }),
                )
                .with_bytes("https://cdn.test/v.mp4", vec![7u8; 32]),
        );
        let client = RetrievalServiceClient::new(mock.clone(), config());

        let media = client.fetch_media("https://www.tiktok.com/@a/video/1").await.unwrap();
        assert_eq!(media.file.read().await.unwrap().len(), 32);
        assert_eq!(media.description.as_deref(), Some("Grandma's dumplings"));
        assert_eq!(media.thumbnail_url, None);
        assert_eq!(media.creator_username.as_deref(), Some("chef_anna"));

        let requests = mock.requests();
        assert_eq!(requests[0].headers[0].1, "Bearer secret");
        assert_eq!(
            requests[0].json.as_ref().unwrap()["url"],
            "https://www.tiktok.com/@a/video/1"
        );
    }

    #[tokio::test]
    async fn test_failed_download_is_error() {
        let mock = Arc::new(
            MockClient::new()
                .with_json(
                    "https://retrieve.test/v1/media",
                    json!({ "download_url": "https://cdn.test/gone.mp4" }),
                )
                .with_status("https://cdn.test/gone.mp4", 410),
        );
        let client = RetrievalServiceClient::new(mock, config());

        let err = client.fetch_media("https://instagram.com/reel/x").await.unwrap_err();
        assert!(matches!(err, ResolveError::Retrieval(_)));
    }

    #[tokio::test]
    async fn test_missing_download_url_is_invalid() {
        let mock = Arc::new(
            MockClient::new().with_json("https://retrieve.test/v1/media", json!({ "error": "private" })),
        );
        let client = RetrievalServiceClient::new(mock, config());

        let err = client.fetch_media("https://instagram.com/reel/x").await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidResponse(_)));
    }
}

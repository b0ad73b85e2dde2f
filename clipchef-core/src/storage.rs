//! Durable object storage for thumbnails and narration audio.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

use crate::config::{self, ConfigError};
use crate::error::FetchError;
use crate::http::{HttpClient, HttpClientBuilder};

/// Bucket holding re-hosted recipe thumbnails.
pub const THUMBNAIL_BUCKET: &str = "recipe-thumbnails";

/// Bucket holding step-zero narration audio.
pub const AUDIO_BUCKET: &str = "step0-audio";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    Upload(#[from] FetchError),

    #[error("Invalid object name: {0}")]
    InvalidName(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Object storage with public read URLs.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `data` under `bucket/name`, overwriting any existing object, and
    /// return its public URL.
    async fn upload(
        &self,
        bucket: &str,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// True when `url` is a public object URL in `bucket`.
fn is_public_object(url: &str, bucket: &str) -> bool {
    let Ok(parsed) = url::Url::parse(url) else {
        return false;
    };
    matches!(parsed.scheme(), "http" | "https")
        && parsed.host_str().is_some()
        && parsed.path().contains(&format!("/object/public/{}/", bucket))
}

/// True when a URL points into the durable thumbnail bucket.
pub fn is_durable_thumbnail(url: &str) -> bool {
    is_public_object(url, THUMBNAIL_BUCKET)
}

/// True when a URL points into the durable narration bucket.
pub fn is_durable_audio(url: &str) -> bool {
    is_public_object(url, AUDIO_BUCKET)
}

fn check_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() || name.starts_with('/') || name.split('/').any(|s| s == "..") {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub base_url: String,
    pub service_key: String,
}

impl StorageConfig {
    /// Required: `STORAGE_URL`, `STORAGE_SERVICE_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: config::required("STORAGE_URL")?
                .trim_end_matches('/')
                .to_string(),
            service_key: config::required("STORAGE_SERVICE_KEY")?,
        })
    }
}

/// REST object storage (`/storage/v1/object/...`).
pub struct HttpObjectStorage {
    client: Arc<dyn HttpClient>,
    config: StorageConfig,
}

impl HttpObjectStorage {
    pub fn from_env() -> Result<Self, StorageError> {
        let config = StorageConfig::from_env()?;
        let client = HttpClientBuilder::new()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(FetchError::from)?;
        Ok(Self::new(Arc::new(client), config))
    }

    pub fn new(client: Arc<dyn HttpClient>, config: StorageConfig) -> Self {
        Self { client, config }
    }

    pub fn public_url(&self, bucket: &str, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.base_url, bucket, name
        )
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn upload(
        &self,
        bucket: &str,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        check_name(name)?;
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.config.base_url, bucket, name
        );
        let auth = format!("Bearer {}", self.config.service_key);
        let size = data.len();

        self.client
            .post_bytes(
                &url,
                &[("Authorization", auth.as_str()), ("x-upsert", "true")],
                content_type,
                data,
            )
            .await?;

        tracing::debug!(bucket, name, size, "storage: uploaded object");
        Ok(self.public_url(bucket, name))
    }
}

/// In-memory storage for tests.
pub struct MemoryStorage {
    base_url: String,
    objects: Mutex<HashMap<(String, String), (Vec<u8>, String)>>,
    fail: bool,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            base_url: "https://storage.test".to_string(),
            objects: Mutex::new(HashMap::new()),
            fail: false,
        }
    }

    /// Every upload fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn get(&self, bucket: &str, name: &str) -> Option<(Vec<u8>, String)> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(bucket.to_string(), name.to_string()))
            .cloned()
    }

    /// Object names in a bucket, sorted.
    pub fn names(&self, bucket: &str) -> Vec<String> {
        let objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, n)| n.clone())
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        bucket: &str,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        check_name(name)?;
        if self.fail {
            return Err(StorageError::Upload(FetchError::Status {
                status: 500,
                url: format!("{}/{}/{}", self.base_url, bucket, name),
                body: "storage unavailable".to_string(),
            }));
        }
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                (bucket.to_string(), name.to_string()),
                (data, content_type.to_string()),
            );
        Ok(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, name
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockClient;

    #[test]
    fn test_durable_marker() {
        assert!(is_durable_thumbnail(
            "https://x.test/storage/v1/object/public/recipe-thumbnails/ab.jpg"
        ));
        assert!(!is_durable_thumbnail("https://i.ytimg.com/vi/abc/hqdefault.jpg"));
        assert!(!is_durable_thumbnail("https://cdn.test/recipe-thumbnails.jpg"));
        assert!(!is_durable_thumbnail(
            "https://cdn.example/mirror/recipe-thumbnails/ab.jpg"
        ));
        assert!(!is_durable_thumbnail(
            "https://x.test/storage/v1/object/public/step0-audio/ab.jpg"
        ));
    }

    #[test]
    fn test_durable_audio() {
        assert!(is_durable_audio(
            "https://x.test/storage/v1/object/public/step0-audio/a.wav"
        ));
        assert!(!is_durable_audio("https://cdn.tiktok.example/tmp/sig=abc/a.mp3"));
        assert!(!is_durable_audio("https://cdn.example/step0-audio/a.wav"));
        assert!(!is_durable_audio("ftp://x.test/storage/v1/object/public/step0-audio/a.wav"));
        assert!(!is_durable_audio("not a url"));
    }

    #[tokio::test]
    async fn test_http_upload() {
        let mock = Arc::new(MockClient::new().with_bytes(
            "https://store.test/storage/v1/object/step0-audio/a.wav",
            Vec::new(),
        ));
        let storage = HttpObjectStorage::new(
            mock.clone(),
            StorageConfig {
                base_url: "https://store.test".to_string(),
                service_key: "svc".to_string(),
            },
        );

        let url = storage
            .upload(AUDIO_BUCKET, "a.wav", vec![1, 2, 3], "audio/wav")
            .await
            .unwrap();
        assert_eq!(
            url,
            "https://store.test/storage/v1/object/public/step0-audio/a.wav"
        );

        let requests = mock.requests();
        assert_eq!(requests[0].content_type.as_deref(), Some("audio/wav"));
        assert_eq!(requests[0].body_len, 3);
        assert_eq!(requests[0].headers[0].1, "Bearer svc");
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let storage = MemoryStorage::new();
        let err = storage
            .upload(THUMBNAIL_BUCKET, "../x.jpg", vec![1], "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidName(_)));
        assert_eq!(storage.object_count(), 0);
    }

    #[tokio::test]
    async fn test_memory_overwrites() {
        let storage = MemoryStorage::new();
        storage
            .upload(THUMBNAIL_BUCKET, "a.jpg", vec![1], "image/jpeg")
            .await
            .unwrap();
        let url = storage
            .upload(THUMBNAIL_BUCKET, "a.jpg", vec![2], "image/jpeg")
            .await
            .unwrap();

        assert!(is_durable_thumbnail(&url));
        assert_eq!(storage.object_count(), 1);
        assert_eq!(storage.get(THUMBNAIL_BUCKET, "a.jpg").unwrap().0, vec![2]);
    }
}

//! Media resolution: decide how a submitted video URL reaches content
//! understanding, and fetch it when it has to be downloaded.

mod fake;
mod retriever;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::{self, ConfigError};
use crate::error::FetchError;
use crate::http::host_of;

pub use fake::FakeRetriever;
pub use retriever::{FetchedMedia, RetrievalServiceClient, RetrieverConfig, VideoRetriever};

/// Domains the understanding service can read directly by URL.
pub const DEFAULT_DIRECT_DOMAINS: &[&str] = &["youtube.com", "youtu.be"];

pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 120;

/// How the video reaches content understanding.
///
/// Fallback only ever goes from `Direct` to `Download`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// The understanding service reads the URL itself.
    Direct,
    /// The video is downloaded through the retrieval service and sent inline.
    Download,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::Download => "download",
        }
    }
}

/// Record of one strategy attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionAttempt {
    pub strategy: Strategy,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Video retrieval failed: {0}")]
    Retrieval(#[from] FetchError),

    #[error("Video retrieval timed out after {0}s")]
    TimedOut(u64),

    #[error("Retrieval service returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to create temp file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Allow-list of directly-understandable domains.
#[derive(Debug, Clone)]
pub struct DirectDomains {
    domains: Vec<String>,
}

impl Default for DirectDomains {
    fn default() -> Self {
        Self::new(DEFAULT_DIRECT_DOMAINS.iter().map(|d| d.to_string()).collect())
    }
}

impl DirectDomains {
    pub fn new(domains: Vec<String>) -> Self {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    /// Read `CLIPCHEF_DIRECT_DOMAINS` (comma-separated), defaulting to YouTube.
    pub fn from_env() -> Self {
        Self::new(config::list_or("CLIPCHEF_DIRECT_DOMAINS", DEFAULT_DIRECT_DOMAINS))
    }

    /// True when the URL's host is an allow-listed domain or one of its
    /// subdomains. Look-alikes such as `notyoutube.com` do not match.
    pub fn allows(&self, url: &str) -> bool {
        let Some(host) = host_of(url) else {
            return false;
        };
        self.domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    pub fn select_strategy(&self, url: &str) -> Strategy {
        if self.allows(url) {
            Strategy::Direct
        } else {
            Strategy::Download
        }
    }
}

/// Extract the video id from a YouTube watch, short, embed or youtu.be URL.
pub fn youtube_video_id(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = host_of(url)?;

    let id = if host == "youtu.be" {
        parsed.path_segments()?.next().map(str::to_string)
    } else if host == "youtube.com" || host.ends_with(".youtube.com") {
        let mut segments = parsed.path_segments()?;
        match segments.next() {
            Some("watch") => parsed
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned()),
            Some("shorts") | Some("embed") | Some("live") => segments.next().map(str::to_string),
            _ => None,
        }
    } else {
        None
    };

    id.filter(|id| {
        !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

/// Thumbnail URL YouTube serves for a video id.
pub fn youtube_thumbnail(url: &str) -> Option<String> {
    youtube_video_id(url).map(|id| format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id))
}

/// A downloaded file that is deleted when dropped.
#[derive(Debug)]
pub struct TempMedia {
    path: tempfile::TempPath,
}

impl TempMedia {
    /// Reserve an empty temp file with the given suffix (e.g. ".mp4").
    pub fn create(suffix: &str) -> std::io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("clipchef-")
            .suffix(suffix)
            .tempfile()?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(self.path()).await
    }

    pub async fn len(&self) -> std::io::Result<u64> {
        Ok(tokio::fs::metadata(self.path()).await?.len())
    }
}

/// Media resolved for content understanding.
#[derive(Debug)]
pub enum MediaContent {
    Direct { url: String },
    Downloaded { file: TempMedia, mime_type: String },
}

/// Normalized result of resolving a URL with one strategy.
#[derive(Debug)]
pub struct ResolvedMedia {
    pub content: MediaContent,
    pub description: Option<String>,
    pub thumbnail_ref: Option<String>,
    pub attribution: Option<String>,
}

impl ResolvedMedia {
    pub fn strategy(&self) -> Strategy {
        match self.content {
            MediaContent::Direct { .. } => Strategy::Direct,
            MediaContent::Downloaded { .. } => Strategy::Download,
        }
    }
}

/// Resolves URLs into [`ResolvedMedia`] using the allow-list and the
/// video retrieval service.
pub struct MediaResolver {
    retriever: Arc<dyn VideoRetriever>,
    domains: DirectDomains,
    download_timeout: Duration,
}

impl MediaResolver {
    pub fn new(
        retriever: Arc<dyn VideoRetriever>,
        domains: DirectDomains,
        download_timeout: Duration,
    ) -> Self {
        Self {
            retriever,
            domains,
            download_timeout,
        }
    }

    /// Build from `CLIPCHEF_DIRECT_DOMAINS` and `CLIPCHEF_DOWNLOAD_TIMEOUT_SECS`.
    pub fn from_env(retriever: Arc<dyn VideoRetriever>) -> Result<Self, ConfigError> {
        Ok(Self::new(
            retriever,
            DirectDomains::from_env(),
            config::secs_or("CLIPCHEF_DOWNLOAD_TIMEOUT_SECS", DEFAULT_DOWNLOAD_TIMEOUT_SECS)?,
        ))
    }

    pub fn initial_strategy(&self, url: &str) -> Strategy {
        self.domains.select_strategy(url)
    }

    pub fn retriever(&self) -> &Arc<dyn VideoRetriever> {
        &self.retriever
    }

    pub fn download_timeout(&self) -> Duration {
        self.download_timeout
    }

    /// Resolve with the given strategy. `Direct` never touches the network.
    pub async fn resolve(&self, url: &str, strategy: Strategy) -> Result<ResolvedMedia, ResolveError> {
        match strategy {
            Strategy::Direct => Ok(ResolvedMedia {
                content: MediaContent::Direct {
                    url: url.to_string(),
                },
                description: None,
                thumbnail_ref: youtube_thumbnail(url),
                attribution: None,
            }),
            Strategy::Download => self.download(url).await,
        }
    }

    async fn download(&self, url: &str) -> Result<ResolvedMedia, ResolveError> {
        let fetched = tokio::time::timeout(self.download_timeout, self.retriever.fetch_media(url))
            .await
            .map_err(|_| ResolveError::TimedOut(self.download_timeout.as_secs()))??;

        tracing::debug!(
            url,
            mime_type = %fetched.mime_type,
            has_description = fetched.description.is_some(),
            "media: downloaded"
        );

        Ok(ResolvedMedia {
            content: MediaContent::Downloaded {
                file: fetched.file,
                mime_type: fetched.mime_type,
            },
            description: fetched.description,
            thumbnail_ref: fetched.thumbnail_url,
            attribution: fetched.creator_username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list_matching() {
        let domains = DirectDomains::default();
        assert!(domains.allows("https://www.youtube.com/watch?v=abc"));
        assert!(domains.allows("https://m.youtube.com/shorts/abc"));
        assert!(domains.allows("https://youtu.be/abc"));
        assert!(!domains.allows("https://notyoutube.com/watch?v=abc"));
        assert!(!domains.allows("https://youtube.com.evil.test/x"));
        assert!(!domains.allows("https://www.tiktok.com/@chef/video/1"));
        assert!(!domains.allows("not a url"));
    }

    #[test]
    fn test_select_strategy() {
        let domains = DirectDomains::new(vec!["Vimeo.com".to_string()]);
        assert_eq!(
            domains.select_strategy("https://player.vimeo.com/1"),
            Strategy::Direct
        );
        assert_eq!(
            domains.select_strategy("https://youtu.be/abc"),
            Strategy::Download
        );
    }

    #[test]
    fn test_youtube_thumbnail() {
        assert_eq!(
            youtube_thumbnail("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=3").as_deref(),
            Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg")
        );
        assert_eq!(
            youtube_video_id("https://youtu.be/abc_-1?si=x").as_deref(),
            Some("abc_-1")
        );
        assert_eq!(
            youtube_video_id("https://youtube.com/shorts/xyz").as_deref(),
            Some("xyz")
        );
        assert_eq!(youtube_video_id("https://www.youtube.com/feed"), None);
        assert_eq!(youtube_video_id("https://vimeo.com/123"), None);
    }

    #[tokio::test]
    async fn test_temp_media_removed_on_drop() {
        let media = TempMedia::create(".mp4").unwrap();
        tokio::fs::write(media.path(), b"video").await.unwrap();
        let path = media.path().to_path_buf();
        assert_eq!(media.len().await.unwrap(), 5);

        drop(media);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_direct_resolution_is_offline() {
        let retriever = Arc::new(FakeRetriever::new());
        let resolver = MediaResolver::new(
            retriever.clone(),
            DirectDomains::default(),
            Duration::from_secs(5),
        );

        let resolved = resolver
            .resolve("https://youtu.be/abc", Strategy::Direct)
            .await
            .unwrap();
        assert_eq!(resolved.strategy(), Strategy::Direct);
        assert_eq!(
            resolved.thumbnail_ref.as_deref(),
            Some("https://i.ytimg.com/vi/abc/hqdefault.jpg")
        );
        assert_eq!(retriever.media_fetches(), 0);
    }

    #[tokio::test]
    async fn test_download_resolution_carries_metadata() {
        let retriever = Arc::new(
            FakeRetriever::new()
                .with_description("2 eggs, butter")
                .with_creator("chef_anna"),
        );
        let resolver = MediaResolver::new(
            retriever.clone(),
            DirectDomains::default(),
            Duration::from_secs(5),
        );

        let resolved = resolver
            .resolve("https://www.tiktok.com/@chef/video/1", Strategy::Download)
            .await
            .unwrap();
        assert_eq!(resolved.strategy(), Strategy::Download);
        assert_eq!(resolved.description.as_deref(), Some("2 eggs, butter"));
        assert_eq!(resolved.attribution.as_deref(), Some("chef_anna"));
        assert_eq!(retriever.media_fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_timeout() {
        let retriever = Arc::new(FakeRetriever::new().with_delay(Duration::from_secs(60)));
        let resolver = MediaResolver::new(retriever, DirectDomains::default(), Duration::from_secs(2));

        let err = resolver
            .resolve("https://www.tiktok.com/@chef/video/1", Strategy::Download)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::TimedOut(2)));
    }
}

//! In-process video retriever for tests.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::{FetchedMedia, ResolveError, TempMedia, VideoRetriever};
use crate::error::FetchError;

/// Writes canned bytes to real temp files and remembers their paths, so tests
/// can assert the files are gone afterwards.
pub struct FakeRetriever {
    video: Vec<u8>,
    thumbnail: Option<Vec<u8>>,
    description: Option<String>,
    thumbnail_url: Option<String>,
    creator: Option<String>,
    fail_media: bool,
    delay: Option<Duration>,
    media_fetches: AtomicUsize,
    thumbnail_fetches: AtomicUsize,
    paths: Mutex<Vec<PathBuf>>,
}

impl Default for FakeRetriever {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRetriever {
    pub fn new() -> Self {
        Self {
            video: b"fake video bytes".to_vec(),
            thumbnail: None,
            description: None,
            thumbnail_url: None,
            creator: None,
            fail_media: false,
            delay: None,
            media_fetches: AtomicUsize::new(0),
            thumbnail_fetches: AtomicUsize::new(0),
            paths: Mutex::new(Vec::new()),
        }
    }

    pub fn with_video(mut self, bytes: Vec<u8>) -> Self {
        self.video = bytes;
        self
    }

    /// Bytes served by `fetch_thumbnail`. Without this, thumbnail fetches fail.
    pub fn with_thumbnail(mut self, bytes: Vec<u8>) -> Self {
        self.thumbnail = Some(bytes);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Thumbnail URL reported alongside downloaded media.
    pub fn with_thumbnail_url(mut self, url: &str) -> Self {
        self.thumbnail_url = Some(url.to_string());
        self
    }

    pub fn with_creator(mut self, creator: &str) -> Self {
        self.creator = Some(creator.to_string());
        self
    }

    pub fn fail_media(mut self) -> Self {
        self.fail_media = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn media_fetches(&self) -> usize {
        self.media_fetches.load(Ordering::SeqCst)
    }

    pub fn thumbnail_fetches(&self) -> usize {
        self.thumbnail_fetches.load(Ordering::SeqCst)
    }

    /// Every temp file path handed out so far.
    pub fn created_paths(&self) -> Vec<PathBuf> {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn write_temp(&self, suffix: &str, bytes: &[u8]) -> Result<TempMedia, ResolveError> {
        let file = TempMedia::create(suffix)?;
        tokio::fs::write(file.path(), bytes).await?;
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(file.path().to_path_buf());
        Ok(file)
    }
}

#[async_trait]
impl VideoRetriever for FakeRetriever {
    async fn fetch_media(&self, url: &str) -> Result<FetchedMedia, ResolveError> {
        self.media_fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_media {
            return Err(ResolveError::Retrieval(FetchError::Status {
                status: 404,
                url: url.to_string(),
                body: "post unavailable".to_string(),
            }));
        }

        Ok(FetchedMedia {
            file: self.write_temp(".mp4", &self.video).await?,
            mime_type: "video/mp4".to_string(),
            description: self.description.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
            creator_username: self.creator.clone(),
        })
    }

    async fn fetch_thumbnail(&self, url: &str) -> Result<TempMedia, ResolveError> {
        self.thumbnail_fetches.fetch_add(1, Ordering::SeqCst);
        match &self.thumbnail {
            Some(bytes) => self.write_temp(".img", bytes).await,
            None => Err(ResolveError::Retrieval(FetchError::Status {
                status: 403,
                url: url.to_string(),
                body: "expired".to_string(),
            })),
        }
    }
}

//! Content extraction: run content understanding on resolved media and turn
//! the answer into a validated [`RecipeDraft`], falling back from direct URL
//! understanding to download-then-analyze.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::ai::{ContentService, MediaInput};
use crate::error::ExtractError;
use crate::media::{MediaContent, MediaResolver, ResolutionAttempt, ResolvedMedia, Strategy};
use crate::types::RecipeDraft;

/// Largest downloaded file sent inline to the understanding service (20 MiB).
pub const MAX_INLINE_BYTES: u64 = 20 * 1024 * 1024;

/// A successful extraction and how it was obtained.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// The draft, with `thumbnail_ref` filled from the resolver when the model gave none.
    pub draft: RecipeDraft,
    pub strategy_used: Strategy,
    pub attempts: Vec<ResolutionAttempt>,
    pub auxiliary_description: Option<String>,
    pub creator: Option<String>,
}

/// Every strategy failed.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ExtractionFailure {
    pub message: String,
    pub attempts: Vec<ResolutionAttempt>,
}

pub struct ContentExtractor {
    service: Arc<dyn ContentService>,
    timeout: Duration,
}

impl ContentExtractor {
    pub fn new(service: Arc<dyn ContentService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    /// Run content understanding once, bounded by the configured timeout.
    pub async fn extract(
        &self,
        media: MediaInput,
        auxiliary: Option<&str>,
    ) -> Result<RecipeDraft, ExtractError> {
        let draft = tokio::time::timeout(self.timeout, self.service.understand(media, auxiliary))
            .await
            .map_err(|_| ExtractError::TimedOut(self.timeout.as_secs()))??
            .normalized();

        draft.validate()?;
        Ok(draft)
    }

    /// Extract from already-resolved media, reading a downloaded file inline.
    pub async fn extract_resolved(
        &self,
        resolved: &ResolvedMedia,
    ) -> Result<RecipeDraft, ExtractError> {
        let media = match &resolved.content {
            MediaContent::Direct { url } => MediaInput::Remote { url: url.clone() },
            MediaContent::Downloaded { file, mime_type } => {
                let size = file.len().await?;
                if size > MAX_INLINE_BYTES {
                    return Err(ExtractError::MediaTooLarge {
                        size,
                        max: MAX_INLINE_BYTES,
                    });
                }
                MediaInput::Inline {
                    data: file.read().await?,
                    mime_type: mime_type.clone(),
                }
            }
        };

        self.extract(media, resolved.description.as_deref()).await
    }

    /// Resolve `url` with the resolver's initial strategy and extract. A failed
    /// direct attempt always falls back to download; a failed download is final.
    ///
    /// Downloaded media is dropped, and its temp file removed, before this returns.
    pub async fn extract_with_fallback(
        &self,
        resolver: &MediaResolver,
        url: &str,
    ) -> Result<Extraction, ExtractionFailure> {
        let mut attempts = Vec::new();
        let mut strategy = resolver.initial_strategy(url);

        loop {
            match self.attempt(resolver, url, strategy).await {
                Ok((mut draft, resolved)) => {
                    attempts.push(ResolutionAttempt {
                        strategy,
                        success: true,
                        error: None,
                    });
                    if draft.thumbnail_ref.is_none() {
                        draft.thumbnail_ref = resolved.thumbnail_ref;
                    }
                    return Ok(Extraction {
                        draft,
                        strategy_used: strategy,
                        attempts,
                        auxiliary_description: resolved.description,
                        creator: resolved.attribution,
                    });
                }
                Err(message) => {
                    tracing::warn!(url, strategy = strategy.as_str(), error = %message, "extraction attempt failed");
                    attempts.push(ResolutionAttempt {
                        strategy,
                        success: false,
                        error: Some(message.clone()),
                    });
                    match strategy {
                        Strategy::Direct => strategy = Strategy::Download,
                        Strategy::Download => {
                            return Err(ExtractionFailure { message, attempts });
                        }
                    }
                }
            }
        }
    }

    async fn attempt(
        &self,
        resolver: &MediaResolver,
        url: &str,
        strategy: Strategy,
    ) -> Result<(RecipeDraft, ResolvedMetadata), String> {
        let resolved = resolver
            .resolve(url, strategy)
            .await
            .map_err(|e| e.to_string())?;
        let draft = self
            .extract_resolved(&resolved)
            .await
            .map_err(|e| e.to_string())?;
        Ok((draft, ResolvedMetadata::from(resolved)))
    }
}

/// The parts of [`ResolvedMedia`] that outlive the media itself.
struct ResolvedMetadata {
    description: Option<String>,
    thumbnail_ref: Option<String>,
    attribution: Option<String>,
}

impl From<ResolvedMedia> for ResolvedMetadata {
    fn from(resolved: ResolvedMedia) -> Self {
        Self {
            description: resolved.description,
            thumbnail_ref: resolved.thumbnail_ref,
            attribution: resolved.attribution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::FakeContentService;
    use crate::media::{DirectDomains, FakeRetriever};

    fn resolver(retriever: Arc<FakeRetriever>) -> MediaResolver {
        MediaResolver::new(retriever, DirectDomains::default(), Duration::from_secs(30))
    }

    #[tokio::test]
    async fn test_direct_success_skips_download() {
        let service = Arc::new(FakeContentService::default());
        let retriever = Arc::new(FakeRetriever::new());
        let extractor = ContentExtractor::new(service.clone(), Duration::from_secs(30));

        let extraction = extractor
            .extract_with_fallback(&resolver(retriever.clone()), "https://youtu.be/abc")
            .await
            .unwrap();

        assert_eq!(extraction.strategy_used, Strategy::Direct);
        assert_eq!(extraction.attempts.len(), 1);
        assert_eq!(
            extraction.draft.thumbnail_ref.as_deref(),
            Some("https://i.ytimg.com/vi/abc/hqdefault.jpg")
        );
        assert_eq!(retriever.media_fetches(), 0);
    }

    #[tokio::test]
    async fn test_direct_failure_falls_back_and_cleans_up() {
        let service = Arc::new(FakeContentService::default().fail_remote());
        let retriever = Arc::new(
            FakeRetriever::new()
                .with_description("from the caption")
                .with_creator("chef"),
        );
        let extractor = ContentExtractor::new(service, Duration::from_secs(30));

        let extraction = extractor
            .extract_with_fallback(&resolver(retriever.clone()), "https://www.youtube.com/watch?v=abc")
            .await
            .unwrap();

        assert_eq!(extraction.strategy_used, Strategy::Download);
        assert_eq!(extraction.attempts.len(), 2);
        assert!(!extraction.attempts[0].success);
        assert_eq!(extraction.auxiliary_description.as_deref(), Some("from the caption"));
        assert_eq!(extraction.creator.as_deref(), Some("chef"));

        let paths = retriever.created_paths();
        assert_eq!(paths.len(), 1);
        assert!(!paths[0].exists());
    }

    #[tokio::test]
    async fn test_download_failure_is_final() {
        let service = Arc::new(FakeContentService::default());
        let retriever = Arc::new(FakeRetriever::new().fail_media());
        let extractor = ContentExtractor::new(service, Duration::from_secs(30));

        let failure = extractor
            .extract_with_fallback(&resolver(retriever), "https://www.tiktok.com/@a/video/1")
            .await
            .unwrap_err();

        assert_eq!(failure.attempts.len(), 1);
        assert_eq!(failure.attempts[0].strategy, Strategy::Download);
        assert!(failure.message.contains("404"));
    }

    #[tokio::test]
    async fn test_invalid_draft_is_rejected() {
        let mut draft = FakeContentService::sample_draft();
        draft.ingredients.clear();
        let extractor = ContentExtractor::new(
            Arc::new(FakeContentService::new(draft)),
            Duration::from_secs(30),
        );

        let err = extractor
            .extract(
                MediaInput::Remote {
                    url: "https://youtu.be/abc".to_string(),
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::MissingField(f) if f == "ingredients"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_understanding_times_out() {
        let service = Arc::new(FakeContentService::default().with_delay(Duration::from_secs(600)));
        let extractor = ContentExtractor::new(service, Duration::from_secs(5));

        let err = extractor
            .extract(
                MediaInput::Remote {
                    url: "https://youtu.be/abc".to_string(),
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::TimedOut(5)));
    }

    #[tokio::test]
    async fn test_oversized_download_is_rejected() {
        let service = Arc::new(FakeContentService::default());
        let retriever = Arc::new(
            FakeRetriever::new().with_video(vec![0u8; MAX_INLINE_BYTES as usize + 1]),
        );
        let extractor = ContentExtractor::new(service.clone(), Duration::from_secs(30));

        let failure = extractor
            .extract_with_fallback(&resolver(retriever), "https://vimeo.com/1")
            .await
            .unwrap_err();
        assert!(failure.message.contains("too large"));
        assert!(service.calls().is_empty());
    }
}

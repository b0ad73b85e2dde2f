//! Thumbnail persistence: copy ephemeral platform thumbnails into durable storage.

use std::time::Duration;

use super::{content_hash, ArtifactError};
use crate::image::{extension_for, validate_image};
use crate::media::VideoRetriever;
use crate::storage::{is_durable_thumbnail, ObjectStorage, THUMBNAIL_BUCKET};
use crate::types::PersistThumbnailOutput;

/// Re-host `thumbnail_ref` in the thumbnail bucket.
///
/// Never fails: on any error the original reference is kept and the error is
/// reported in the output. A reference already in durable storage is returned
/// untouched without fetching or uploading.
pub async fn persist_thumbnail(
    retriever: &dyn VideoRetriever,
    storage: &dyn ObjectStorage,
    thumbnail_ref: Option<&str>,
    timeout: Duration,
) -> PersistThumbnailOutput {
    let Some(original) = thumbnail_ref.map(str::trim).filter(|s| !s.is_empty()) else {
        return PersistThumbnailOutput {
            thumbnail_url: None,
            rehosted: false,
            error: None,
        };
    };

    if is_durable_thumbnail(original) {
        return PersistThumbnailOutput {
            thumbnail_url: Some(original.to_string()),
            rehosted: false,
            error: None,
        };
    }

    match rehost(retriever, storage, original, timeout).await {
        Ok(url) => PersistThumbnailOutput {
            thumbnail_url: Some(url),
            rehosted: true,
            error: None,
        },
        Err(e) => {
            tracing::warn!(thumbnail = original, error = %e, "thumbnail re-host failed, keeping original");
            PersistThumbnailOutput {
                thumbnail_url: Some(original.to_string()),
                rehosted: false,
                error: Some(e.to_string()),
            }
        }
    }
}

async fn rehost(
    retriever: &dyn VideoRetriever,
    storage: &dyn ObjectStorage,
    url: &str,
    timeout: Duration,
) -> Result<String, ArtifactError> {
    let file = tokio::time::timeout(timeout, retriever.fetch_thumbnail(url))
        .await
        .map_err(|_| ArtifactError::TimedOut("thumbnail fetch", timeout.as_secs()))??;
    let data = file.read().await?;
    drop(file);

    let content_type = validate_image(&data).map_err(ArtifactError::InvalidImage)?;
    let name = format!("{}.{}", content_hash(&data), extension_for(&content_type));

    Ok(storage
        .upload(THUMBNAIL_BUCKET, &name, data, &content_type)
        .await?)
}

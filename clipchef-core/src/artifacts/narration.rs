//! Step-zero narration: speak the summary and store the audio.

use std::time::Duration;

use super::{content_hash, ArtifactError};
use crate::ai::ContentService;
use crate::storage::{ObjectStorage, AUDIO_BUCKET};
use crate::types::{StepZero, SynthesizeNarrationOutput};

/// Produce the step-zero pair for `summary`.
///
/// Without a summary nothing is done. Any failure yields neither summary nor
/// audio, with the error reported in the output.
pub async fn synthesize_narration(
    service: &dyn ContentService,
    storage: &dyn ObjectStorage,
    summary: Option<&str>,
    timeout: Duration,
) -> SynthesizeNarrationOutput {
    let Some(summary) = summary.map(str::trim).filter(|s| !s.is_empty()) else {
        return SynthesizeNarrationOutput {
            step_zero: None,
            error: None,
        };
    };

    match narrate(service, storage, summary, timeout).await {
        Ok(audio_url) => SynthesizeNarrationOutput {
            step_zero: Some(StepZero {
                summary: summary.to_string(),
                audio_url,
            }),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "narration failed, saving without step zero");
            SynthesizeNarrationOutput {
                step_zero: None,
                error: Some(e.to_string()),
            }
        }
    }
}

async fn narrate(
    service: &dyn ContentService,
    storage: &dyn ObjectStorage,
    summary: &str,
    timeout: Duration,
) -> Result<String, ArtifactError> {
    let audio = tokio::time::timeout(timeout, service.synthesize_speech(summary))
        .await
        .map_err(|_| ArtifactError::TimedOut("speech synthesis", timeout.as_secs()))??;

    let name = format!("{}.wav", content_hash(&audio.data));
    Ok(storage
        .upload(AUDIO_BUCKET, &name, audio.data, &audio.content_type)
        .await?)
}

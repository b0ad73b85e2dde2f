//! PersistThumbnail step - copies the thumbnail into durable storage.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::artifacts::persist_thumbnail;
use crate::media::VideoRetriever;
use crate::pipeline::{PipelineStep, StepContext, StepMetadata, StepResult};
use crate::storage::ObjectStorage;
use crate::types::ExtractRecipeOutput;

use super::{ExtractRecipeStep, GenerateEmbeddingStep};

/// Best-effort: always succeeds, falling back to the original reference.
pub struct PersistThumbnailStep {
    retriever: Arc<dyn VideoRetriever>,
    storage: Arc<dyn ObjectStorage>,
    timeout: Duration,
}

impl PersistThumbnailStep {
    /// Step name constant.
    pub const NAME: &'static str = "persist_thumbnail";

    pub fn new(
        retriever: Arc<dyn VideoRetriever>,
        storage: Arc<dyn ObjectStorage>,
        timeout: Duration,
    ) -> Self {
        Self {
            retriever,
            storage,
            timeout,
        }
    }
}

#[async_trait]
impl PipelineStep for PersistThumbnailStep {
    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            name: Self::NAME,
            description: "Re-host the thumbnail in durable storage",
            continues_on_failure: true,
        }
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> StepResult {
        let start = Instant::now();

        let extract: ExtractRecipeOutput = match ctx.output(ExtractRecipeStep::NAME) {
            Ok(o) => o,
            Err(e) => {
                let mut result = StepResult::failed(Self::NAME, e, start);
                result.next_step = Some(GenerateEmbeddingStep::NAME.to_string());
                return result;
            }
        };

        let output = persist_thumbnail(
            self.retriever.as_ref(),
            self.storage.as_ref(),
            extract.draft.thumbnail_ref.as_deref(),
            self.timeout,
        )
        .await;

        StepResult::succeeded(Self::NAME, &output, Some(GenerateEmbeddingStep::NAME), start)
    }
}

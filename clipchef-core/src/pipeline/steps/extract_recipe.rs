//! ExtractRecipe step - turns the submitted video into a recipe draft.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::extract::ContentExtractor;
use crate::media::MediaResolver;
use crate::pipeline::{PipelineStep, StepContext, StepMetadata, StepResult};
use crate::types::ExtractRecipeOutput;

use super::PersistThumbnailStep;

/// Resolves the URL (direct first when allow-listed, download otherwise or on
/// failure) and runs content understanding on it.
pub struct ExtractRecipeStep {
    resolver: Arc<MediaResolver>,
    extractor: Arc<ContentExtractor>,
}

impl ExtractRecipeStep {
    /// Step name constant.
    pub const NAME: &'static str = "extract_recipe";

    pub fn new(resolver: Arc<MediaResolver>, extractor: Arc<ContentExtractor>) -> Self {
        Self {
            resolver,
            extractor,
        }
    }
}

#[async_trait]
impl PipelineStep for ExtractRecipeStep {
    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            name: Self::NAME,
            description: "Resolve media and extract a recipe draft",
            continues_on_failure: false,
        }
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> StepResult {
        let start = Instant::now();

        match self
            .extractor
            .extract_with_fallback(&self.resolver, ctx.url)
            .await
        {
            Ok(extraction) => {
                tracing::info!(
                    url = ctx.url,
                    strategy = extraction.strategy_used.as_str(),
                    title = %extraction.draft.title,
                    "recipe extracted"
                );
                let output = ExtractRecipeOutput {
                    draft: extraction.draft,
                    strategy_used: extraction.strategy_used,
                    attempts: extraction.attempts,
                    auxiliary_description: extraction.auxiliary_description,
                    creator: extraction.creator,
                };
                StepResult::succeeded(Self::NAME, &output, Some(PersistThumbnailStep::NAME), start)
            }
            Err(failure) => {
                let mut result = StepResult::failed(Self::NAME, failure.message.clone(), start);
                // Keep the attempt log for diagnosis.
                result.output = serde_json::json!({
                    "error": failure.message,
                    "attempts": failure.attempts,
                });
                result
            }
        }
    }
}

//! GenerateEmbedding step - required semantic embedding.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::ai::ContentService;
use crate::artifacts::generate_embedding;
use crate::pipeline::{PipelineStep, StepContext, StepMetadata, StepResult};
use crate::types::{ExtractRecipeOutput, GenerateEmbeddingOutput};

use super::{ExtractRecipeStep, SynthesizeNarrationStep};

pub struct GenerateEmbeddingStep {
    service: Arc<dyn ContentService>,
    timeout: Duration,
}

impl GenerateEmbeddingStep {
    /// Step name constant.
    pub const NAME: &'static str = "generate_embedding";

    pub fn new(service: Arc<dyn ContentService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }
}

#[async_trait]
impl PipelineStep for GenerateEmbeddingStep {
    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            name: Self::NAME,
            description: "Embed the recipe for semantic search",
            continues_on_failure: false,
        }
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> StepResult {
        let start = Instant::now();

        let extract: ExtractRecipeOutput = match ctx.output(ExtractRecipeStep::NAME) {
            Ok(o) => o,
            Err(e) => return StepResult::failed(Self::NAME, e, start),
        };

        match generate_embedding(
            self.service.as_ref(),
            &extract.draft,
            extract.auxiliary_description.as_deref(),
            self.timeout,
        )
        .await
        {
            Ok(embedding) => StepResult::succeeded(
                Self::NAME,
                &GenerateEmbeddingOutput { embedding },
                Some(SynthesizeNarrationStep::NAME),
                start,
            ),
            Err(e) => StepResult::failed(Self::NAME, e.to_string(), start),
        }
    }
}

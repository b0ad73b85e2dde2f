//! SynthesizeNarration step - optional step-zero audio.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::ai::ContentService;
use crate::artifacts::synthesize_narration;
use crate::pipeline::{PipelineStep, StepContext, StepMetadata, StepResult};
use crate::storage::ObjectStorage;
use crate::types::ExtractRecipeOutput;

use super::{ExtractRecipeStep, SaveRecipeStep};

/// Best-effort: a failure leaves the recipe without a step-zero pair.
pub struct SynthesizeNarrationStep {
    service: Arc<dyn ContentService>,
    storage: Arc<dyn ObjectStorage>,
    timeout: Duration,
}

impl SynthesizeNarrationStep {
    /// Step name constant.
    pub const NAME: &'static str = "synthesize_narration";

    pub fn new(
        service: Arc<dyn ContentService>,
        storage: Arc<dyn ObjectStorage>,
        timeout: Duration,
    ) -> Self {
        Self {
            service,
            storage,
            timeout,
        }
    }
}

#[async_trait]
impl PipelineStep for SynthesizeNarrationStep {
    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            name: Self::NAME,
            description: "Narrate the step-zero summary",
            continues_on_failure: true,
        }
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> StepResult {
        let start = Instant::now();

        let extract: ExtractRecipeOutput = match ctx.output(ExtractRecipeStep::NAME) {
            Ok(o) => o,
            Err(e) => {
                let mut result = StepResult::failed(Self::NAME, e, start);
                result.next_step = Some(SaveRecipeStep::NAME.to_string());
                return result;
            }
        };

        let output = synthesize_narration(
            self.service.as_ref(),
            self.storage.as_ref(),
            extract.draft.step_zero_summary.as_deref(),
            self.timeout,
        )
        .await;

        StepResult::succeeded(Self::NAME, &output, Some(SaveRecipeStep::NAME), start)
    }
}

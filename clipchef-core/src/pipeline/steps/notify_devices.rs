//! NotifyDevices step - tells the user's devices the recipe is ready.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use uuid::Uuid;

use crate::notify::{Notifier, PushMessage};
use crate::pipeline::{PipelineStep, StepContext, StepMetadata, StepResult};
use crate::store::RecipeStore;
use crate::types::{ExtractRecipeOutput, NotifyDevicesOutput, SaveRecipeOutput};

use super::{ExtractRecipeStep, SaveRecipeStep};

pub struct NotifyDevicesStep {
    store: Arc<dyn RecipeStore>,
    notifier: Arc<dyn Notifier>,
    user_id: Uuid,
}

impl NotifyDevicesStep {
    /// Step name constant.
    pub const NAME: &'static str = "notify_devices";

    pub fn new(store: Arc<dyn RecipeStore>, notifier: Arc<dyn Notifier>, user_id: Uuid) -> Self {
        Self {
            store,
            notifier,
            user_id,
        }
    }
}

#[async_trait]
impl PipelineStep for NotifyDevicesStep {
    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            name: Self::NAME,
            description: "Push a notification to the user's devices",
            continues_on_failure: true,
        }
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> StepResult {
        let start = Instant::now();

        let saved: SaveRecipeOutput = match ctx.output(SaveRecipeStep::NAME) {
            Ok(o) => o,
            Err(e) => return StepResult::failed(Self::NAME, e, start),
        };
        let title = ctx
            .output::<ExtractRecipeOutput>(ExtractRecipeStep::NAME)
            .map(|o| o.draft.title)
            .unwrap_or_default();

        let tokens = match self.store.device_tokens(self.user_id).await {
            Ok(t) => t,
            Err(e) => return StepResult::failed(Self::NAME, e.to_string(), start),
        };

        let message = PushMessage::recipe_ready(saved.recipe_id, &title);
        let mut output = NotifyDevicesOutput::default();
        for token in &tokens {
            match self.notifier.notify(token, &message).await {
                Ok(()) => output.sent += 1,
                Err(e) => {
                    output.failed += 1;
                    tracing::warn!(user_id = %self.user_id, error = %e, "push notification failed");
                }
            }
        }

        StepResult::succeeded(Self::NAME, &output, None, start)
    }
}

//! SaveRecipe step - persists the recipe with its artifacts.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use uuid::Uuid;

use crate::pipeline::{PipelineStep, StepContext, StepMetadata, StepResult};
use crate::store::{NewRecipe, RecipeStore};
use crate::types::{
    ExtractRecipeOutput, GenerateEmbeddingOutput, PersistThumbnailOutput, SaveRecipeOutput,
    SynthesizeNarrationOutput,
};

use super::{
    ExtractRecipeStep, GenerateEmbeddingStep, NotifyDevicesStep, PersistThumbnailStep,
    SynthesizeNarrationStep,
};

/// Writes exactly one recipe for the ingestion's user.
pub struct SaveRecipeStep {
    store: Arc<dyn RecipeStore>,
    user_id: Uuid,
}

impl SaveRecipeStep {
    /// Step name constant.
    pub const NAME: &'static str = "save_recipe";

    pub fn new(store: Arc<dyn RecipeStore>, user_id: Uuid) -> Self {
        Self { store, user_id }
    }

    fn build(&self, ctx: &StepContext<'_>) -> Result<NewRecipe, String> {
        let extract: ExtractRecipeOutput = ctx.output(ExtractRecipeStep::NAME)?;
        let embedding: GenerateEmbeddingOutput = ctx.output(GenerateEmbeddingStep::NAME)?;

        // Best-effort steps may have left no output; fall back to the draft.
        let thumbnail_url = match ctx.output::<PersistThumbnailOutput>(PersistThumbnailStep::NAME) {
            Ok(o) => o.thumbnail_url,
            Err(_) => extract.draft.thumbnail_ref.clone(),
        };
        let step_zero = ctx
            .output::<SynthesizeNarrationOutput>(SynthesizeNarrationStep::NAME)
            .ok()
            .and_then(|o| o.step_zero);

        let draft = extract.draft;
        Ok(NewRecipe {
            user_id: self.user_id,
            title: draft.title,
            description: draft.description,
            ingredients: draft.ingredients,
            instructions: draft.instructions,
            thumbnail_url,
            source_url: ctx.url.to_string(),
            creator: extract.creator,
            embedding: embedding.embedding,
            step_zero,
            parent_recipe_id: None,
            chefs_note: None,
            difficulty: draft.difficulty,
            cooking_time_minutes: draft.cooking_time_minutes,
        })
    }
}

#[async_trait]
impl PipelineStep for SaveRecipeStep {
    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            name: Self::NAME,
            description: "Save recipe to storage",
            continues_on_failure: false,
        }
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> StepResult {
        let start = Instant::now();

        let new_recipe = match self.build(ctx) {
            Ok(r) => r,
            Err(e) => return StepResult::failed(Self::NAME, e, start),
        };

        match self.store.create_recipe(new_recipe).await {
            Ok(recipe) => {
                tracing::info!(recipe_id = %recipe.id, user_id = %self.user_id, "recipe saved");
                StepResult::succeeded(
                    Self::NAME,
                    &SaveRecipeOutput {
                        recipe_id: recipe.id,
                    },
                    Some(NotifyDevicesStep::NAME),
                    start,
                )
            }
            Err(e) => StepResult::failed(Self::NAME, e.to_string(), start),
        }
    }
}

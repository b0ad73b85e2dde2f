//! Background precomputation of per-step preparation guides.
//!
//! Runs after the recipe is saved and visible. One attempt; a failure is
//! logged and the recipe simply stays without guides.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::ai::prompts::{
    parse_step_preparation_response, render_step_preparation_prompt,
    STEP_PREPARATION_PROMPT_NAME,
};
use crate::ai::{AiError, ChatMessage, ChatRequest, ContentService};
use crate::store::{Recipe, RecipeStore, StoreError};
use crate::types::StepPreparation;

#[derive(Error, Debug)]
pub enum PrecomputeError {
    #[error("Content service error: {0}")]
    Ai(#[from] AiError),

    #[error("Step preparation timed out after {0}s")]
    TimedOut(u64),

    #[error("No usable step preparations returned")]
    Empty,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Ask the content service for a preparation guide covering `recipe`'s steps.
pub async fn generate_step_preparations(
    service: &dyn ContentService,
    recipe: &Recipe,
    timeout: Duration,
) -> Result<Vec<StepPreparation>, PrecomputeError> {
    let prompt =
        render_step_preparation_prompt(&recipe.title, &recipe.ingredients, &recipe.instructions);
    let request = ChatRequest {
        messages: vec![ChatMessage::user(prompt)],
        json_response: true,
        max_output_tokens: Some(4096),
        temperature: Some(0.2),
    };

    let response = tokio::time::timeout(
        timeout,
        service.complete(STEP_PREPARATION_PROMPT_NAME, request),
    )
    .await
    .map_err(|_| PrecomputeError::TimedOut(timeout.as_secs()))??;

    let steps = parse_step_preparation_response(&response.content, recipe.instructions.len())?;
    if steps.is_empty() {
        return Err(PrecomputeError::Empty);
    }
    Ok(steps)
}

/// Load the recipe, generate its guides and store them. Returns the number of
/// guides stored.
pub async fn precompute_step_preparations(
    service: &dyn ContentService,
    store: &dyn RecipeStore,
    user_id: Uuid,
    recipe_id: Uuid,
    timeout: Duration,
) -> Result<usize, PrecomputeError> {
    let recipe = store.get_recipe(user_id, recipe_id).await?;
    let steps = generate_step_preparations(service, &recipe, timeout).await?;
    let count = steps.len();
    store.set_step_preparations(recipe_id, steps).await?;
    Ok(count)
}

/// Detach precomputation. The handle is only useful to tests; production
/// callers drop it.
pub fn spawn_precompute(
    service: Arc<dyn ContentService>,
    store: Arc<dyn RecipeStore>,
    user_id: Uuid,
    recipe_id: Uuid,
    timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match precompute_step_preparations(
            service.as_ref(),
            store.as_ref(),
            user_id,
            recipe_id,
            timeout,
        )
        .await
        {
            Ok(count) => {
                tracing::info!(%recipe_id, steps = count, "step preparations stored");
            }
            Err(e) => {
                tracing::warn!(%recipe_id, %user_id, error = %e, "step preparation precompute failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{FakeCall, FakeContentService};
    use crate::store::{MemoryRecipeStore, NewRecipe};
    use crate::types::Ingredient;

    async fn saved_recipe(store: &MemoryRecipeStore, user_id: Uuid) -> Recipe {
        store
            .create_recipe(NewRecipe {
                user_id,
                title: "Pasta".to_string(),
                description: String::new(),
                ingredients: vec![Ingredient::named("spaghetti")],
                instructions: vec!["Boil water".to_string(), "Cook pasta".to_string()],
                thumbnail_url: None,
                source_url: "https://youtu.be/abc".to_string(),
                creator: None,
                embedding: vec![0.1],
                step_zero: None,
                parent_recipe_id: None,
                chefs_note: None,
                difficulty: None,
                cooking_time_minutes: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_stores_valid_steps() {
        let service = Arc::new(FakeContentService::default().with_completion(
            STEP_PREPARATION_PROMPT_NAME,
            r#"{"steps": [{"step": 1, "equipment": ["pot"]}, {"step": 2, "ingredients": ["spaghetti"]}, {"step": 9}]}"#,
        ));
        let store = Arc::new(MemoryRecipeStore::new());
        let user_id = Uuid::new_v4();
        let recipe = saved_recipe(&store, user_id).await;

        spawn_precompute(
            service.clone(),
            store.clone(),
            user_id,
            recipe.id,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        let steps = store.recipe(recipe.id).unwrap().step_preparations.unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].equipment, vec!["pot"]);
        assert_eq!(
            service.calls(),
            vec![FakeCall::Complete(STEP_PREPARATION_PROMPT_NAME.to_string())]
        );
    }

    #[tokio::test]
    async fn test_empty_result_is_failure() {
        let service = FakeContentService::default()
            .with_completion(STEP_PREPARATION_PROMPT_NAME, r#"{"steps": [{"step": 5}]}"#);
        let store = MemoryRecipeStore::new();
        let user_id = Uuid::new_v4();
        let recipe = saved_recipe(&store, user_id).await;

        let err = precompute_step_preparations(
            &service,
            &store,
            user_id,
            recipe.id,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PrecomputeError::Empty));
        assert!(store.recipe(recipe.id).unwrap().step_preparations.is_none());
    }

    #[tokio::test]
    async fn test_service_failure_is_single_attempt() {
        // No registered completion: the fake answers with an error.
        let service = FakeContentService::default();
        let store = MemoryRecipeStore::new();
        let user_id = Uuid::new_v4();
        let recipe = saved_recipe(&store, user_id).await;

        let err = precompute_step_preparations(&service, &store, user_id, recipe.id, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, PrecomputeError::Ai(_)));
        assert_eq!(service.calls().len(), 1);
    }
}

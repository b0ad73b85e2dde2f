//! In-memory recipe store for tests and local runs.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::{NewRecipe, Recipe, RecipeStore, RecipeVersion, StoreError};
use crate::types::StepPreparation;
use crate::versioning::{plan_remix, Remix, VersionState};

#[derive(Default)]
struct State {
    recipes: HashMap<Uuid, Recipe>,
    versions: Vec<RecipeVersion>,
    devices: Vec<(Uuid, String)>,
    /// Number of upcoming `commit_remix` calls that report a conflict.
    injected_conflicts: usize,
    commit_attempts: usize,
}

/// A single lock guards everything, so each remix plans and commits under one
/// critical section. `(recipe_id, version_number)` uniqueness is still checked.
#[derive(Default)]
pub struct MemoryRecipeStore {
    state: Mutex<State>,
}

impl MemoryRecipeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `count` remix commits fail with a version conflict.
    pub fn inject_conflicts(&self, count: usize) {
        self.lock().injected_conflicts = count;
    }

    /// Total `commit_remix` calls, including conflicting ones.
    pub fn commit_attempts(&self) -> usize {
        self.lock().commit_attempts
    }

    pub fn recipe_count(&self) -> usize {
        self.lock().recipes.len()
    }

    /// Fetch a recipe regardless of owner.
    pub fn recipe(&self, recipe_id: Uuid) -> Option<Recipe> {
        self.lock().recipes.get(&recipe_id).cloned()
    }
}

fn owned(state: &State, user_id: Uuid, recipe_id: Uuid) -> Result<&Recipe, StoreError> {
    state
        .recipes
        .get(&recipe_id)
        .filter(|r| r.user_id == user_id)
        .ok_or(StoreError::NotFound)
}

#[async_trait]
impl RecipeStore for MemoryRecipeStore {
    async fn create_recipe(&self, recipe: NewRecipe) -> Result<Recipe, StoreError> {
        recipe.validate()?;
        let now = Utc::now();
        let created = Recipe {
            id: Uuid::new_v4(),
            user_id: recipe.user_id,
            title: recipe.title,
            description: recipe.description,
            ingredients: recipe.ingredients,
            instructions: recipe.instructions,
            thumbnail_url: recipe.thumbnail_url,
            source_url: recipe.source_url,
            creator: recipe.creator,
            embedding: recipe.embedding,
            step_zero: recipe.step_zero,
            step_preparations: None,
            favorite: false,
            parent_recipe_id: recipe.parent_recipe_id,
            chefs_note: recipe.chefs_note,
            difficulty: recipe.difficulty,
            cooking_time_minutes: recipe.cooking_time_minutes,
            created_at: now,
            updated_at: now,
        };
        self.lock().recipes.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_recipe(&self, user_id: Uuid, recipe_id: Uuid) -> Result<Recipe, StoreError> {
        owned(&self.lock(), user_id, recipe_id).cloned()
    }

    async fn list_recipes(&self, user_id: Uuid) -> Result<Vec<Recipe>, StoreError> {
        let state = self.lock();
        let mut recipes: Vec<Recipe> = state
            .recipes
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        recipes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(recipes)
    }

    async fn set_favorite(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
        favorite: bool,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        let recipe = state
            .recipes
            .get_mut(&recipe_id)
            .filter(|r| r.user_id == user_id)
            .ok_or(StoreError::NotFound)?;
        recipe.favorite = favorite;
        Ok(())
    }

    async fn set_step_preparations(
        &self,
        recipe_id: Uuid,
        preparations: Vec<StepPreparation>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        let recipe = state
            .recipes
            .get_mut(&recipe_id)
            .ok_or(StoreError::NotFound)?;
        recipe.step_preparations = Some(preparations);
        Ok(())
    }

    async fn commit_remix(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
        remix: &Remix,
    ) -> Result<Vec<RecipeVersion>, StoreError> {
        let mut state = self.lock();
        state.commit_attempts += 1;

        let recipe = owned(&state, user_id, recipe_id)?.clone();
        let latest = state
            .versions
            .iter()
            .filter(|v| v.recipe_id == recipe_id)
            .map(|v| v.version_number)
            .max();

        let plan = plan_remix(&recipe, VersionState::from_latest(latest), remix, Utc::now())
            .map_err(|e| StoreError::Invalid(e.to_string()))?;

        if state.injected_conflicts > 0 {
            state.injected_conflicts -= 1;
            return Err(StoreError::VersionConflict {
                recipe_id,
                version_number: plan.versions[0].version_number,
            });
        }

        for version in &plan.versions {
            let taken = state
                .versions
                .iter()
                .any(|v| v.recipe_id == recipe_id && v.version_number == version.version_number);
            if taken {
                return Err(StoreError::VersionConflict {
                    recipe_id,
                    version_number: version.version_number,
                });
            }
        }

        let written: Vec<RecipeVersion> = plan
            .versions
            .into_iter()
            .map(|v| v.into_version(Uuid::new_v4()))
            .collect();
        state.versions.extend(written.iter().cloned());
        if let Some(recipe) = state.recipes.get_mut(&recipe_id) {
            plan.update.apply(recipe);
        }
        Ok(written)
    }

    async fn list_versions(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<Vec<RecipeVersion>, StoreError> {
        let state = self.lock();
        owned(&state, user_id, recipe_id)?;
        let mut versions: Vec<RecipeVersion> = state
            .versions
            .iter()
            .filter(|v| v.recipe_id == recipe_id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        Ok(versions)
    }

    async fn register_device(&self, user_id: Uuid, token: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        let exists = state
            .devices
            .iter()
            .any(|(u, t)| *u == user_id && t == token);
        if !exists {
            state.devices.push((user_id, token.to_string()));
        }
        Ok(())
    }

    async fn device_tokens(&self, user_id: Uuid) -> Result<Vec<String>, StoreError> {
        Ok(self
            .lock()
            .devices
            .iter()
            .filter(|(u, _)| *u == user_id)
            .map(|(_, t)| t.clone())
            .collect())
    }
}

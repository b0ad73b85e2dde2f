//! Recipe persistence: recipes, their append-only version history, and the
//! device tokens used for notifications.

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::{Difficulty, Ingredient, StepPreparation, StepZero};
use crate::versioning::Remix;

pub use memory::MemoryRecipeStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Recipe not found")]
    NotFound,

    /// Another writer took this version number first.
    #[error("Version {version_number} of recipe {recipe_id} already exists")]
    VersionConflict { recipe_id: Uuid, version_number: i32 },

    #[error("Invalid data: {0}")]
    Invalid(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// A persisted recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub thumbnail_url: Option<String>,
    pub source_url: String,
    pub creator: Option<String>,
    pub embedding: Vec<f32>,
    pub step_zero: Option<StepZero>,
    /// Filled in by background precomputation after the recipe is visible.
    pub step_preparations: Option<Vec<StepPreparation>>,
    pub favorite: bool,
    pub parent_recipe_id: Option<Uuid>,
    pub chefs_note: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub cooking_time_minutes: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new recipe. Ids and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub thumbnail_url: Option<String>,
    pub source_url: String,
    pub creator: Option<String>,
    pub embedding: Vec<f32>,
    pub step_zero: Option<StepZero>,
    pub parent_recipe_id: Option<Uuid>,
    pub chefs_note: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub cooking_time_minutes: Option<u32>,
}

impl NewRecipe {
    /// Every recipe carries an embedding.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.embedding.is_empty() {
            return Err(StoreError::Invalid("embedding is required".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(StoreError::Invalid("title is required".to_string()));
        }
        Ok(())
    }
}

/// One entry of a recipe's version history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeVersion {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub version_number: i32,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub chefs_note: Option<String>,
    pub changed_ingredients: Vec<String>,
    pub step_zero: Option<StepZero>,
    pub difficulty: Option<Difficulty>,
    pub cooking_time_minutes: Option<u32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipeVersion {
    pub recipe_id: Uuid,
    pub version_number: i32,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub chefs_note: Option<String>,
    pub changed_ingredients: Vec<String>,
    pub step_zero: Option<StepZero>,
    pub difficulty: Option<Difficulty>,
    pub cooking_time_minutes: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl NewRecipeVersion {
    pub fn into_version(self, id: Uuid) -> RecipeVersion {
        RecipeVersion {
            id,
            recipe_id: self.recipe_id,
            version_number: self.version_number,
            title: self.title,
            description: self.description,
            ingredients: self.ingredients,
            instructions: self.instructions,
            chefs_note: self.chefs_note,
            changed_ingredients: self.changed_ingredients,
            step_zero: self.step_zero,
            difficulty: self.difficulty,
            cooking_time_minutes: self.cooking_time_minutes,
            created_at: self.created_at,
        }
    }
}

/// New values for a recipe's mutable fields after a remix.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeUpdate {
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub chefs_note: Option<String>,
    pub step_zero: Option<StepZero>,
    pub difficulty: Option<Difficulty>,
    pub cooking_time_minutes: Option<u32>,
    pub updated_at: DateTime<Utc>,
}

impl RecipeUpdate {
    pub fn apply(self, recipe: &mut Recipe) {
        recipe.title = self.title;
        recipe.description = self.description;
        recipe.ingredients = self.ingredients;
        recipe.instructions = self.instructions;
        recipe.chefs_note = self.chefs_note;
        recipe.step_zero = self.step_zero;
        recipe.difficulty = self.difficulty;
        recipe.cooking_time_minutes = self.cooking_time_minutes;
        recipe.updated_at = self.updated_at;
    }
}

/// Persistence for recipes and their history.
///
/// Ownership is enforced here: lookups keyed by a user return
/// [`StoreError::NotFound`] for recipes owned by someone else.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn create_recipe(&self, recipe: NewRecipe) -> Result<Recipe, StoreError>;

    /// Fetch a recipe owned by `user_id`.
    async fn get_recipe(&self, user_id: Uuid, recipe_id: Uuid) -> Result<Recipe, StoreError>;

    /// A user's recipes, newest first.
    async fn list_recipes(&self, user_id: Uuid) -> Result<Vec<Recipe>, StoreError>;

    async fn set_favorite(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
        favorite: bool,
    ) -> Result<(), StoreError>;

    async fn set_step_preparations(
        &self,
        recipe_id: Uuid,
        preparations: Vec<StepPreparation>,
    ) -> Result<(), StoreError>;

    /// Plan and commit one remix atomically, returning the versions written.
    ///
    /// Implementations read the recipe and its latest version number, call
    /// [`crate::versioning::plan_remix`], then write the versions and the
    /// recipe update as one unit, serialized per recipe. A version-number
    /// collision surfaces as [`StoreError::VersionConflict`].
    async fn commit_remix(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
        remix: &Remix,
    ) -> Result<Vec<RecipeVersion>, StoreError>;

    /// All versions of a recipe owned by `user_id`, highest version first.
    async fn list_versions(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<Vec<RecipeVersion>, StoreError>;

    /// Register a push token for a user. Registering twice is a no-op.
    async fn register_device(&self, user_id: Uuid, token: &str) -> Result<(), StoreError>;

    async fn device_tokens(&self, user_id: Uuid) -> Result<Vec<String>, StoreError>;
}

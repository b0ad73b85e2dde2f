use chrono::{DateTime, Utc};
use clipchef_core::store::{NewRecipe, NewRecipeVersion, Recipe, RecipeVersion, StoreError};
use clipchef_core::types::{Difficulty, Ingredient, StepPreparation, StepZero};
use diesel::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::recipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RecipeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub ingredients: serde_json::Value,
    pub instructions: serde_json::Value,
    pub thumbnail_url: Option<String>,
    pub source_url: String,
    pub creator: Option<String>,
    pub embedding: Vec<f32>,
    pub step0_summary: Option<String>,
    pub step0_audio_url: Option<String>,
    pub step_preparations: Option<serde_json::Value>,
    pub favorite: bool,
    pub parent_recipe_id: Option<Uuid>,
    pub chefs_note: Option<String>,
    pub difficulty: Option<String>,
    pub cooking_time_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecipeRow {
    pub fn into_recipe(self) -> Result<Recipe, StoreError> {
        let step_preparations = match self.step_preparations {
            Some(value) => Some(from_json::<Vec<StepPreparation>>("step_preparations", value)?),
            None => None,
        };
        Ok(Recipe {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            ingredients: from_json::<Vec<Ingredient>>("ingredients", self.ingredients)?,
            instructions: from_json::<Vec<String>>("instructions", self.instructions)?,
            thumbnail_url: self.thumbnail_url,
            source_url: self.source_url,
            creator: self.creator,
            embedding: self.embedding,
            step_zero: step_zero(self.step0_summary, self.step0_audio_url)?,
            step_preparations,
            favorite: self.favorite,
            parent_recipe_id: self.parent_recipe_id,
            chefs_note: self.chefs_note,
            difficulty: self.difficulty.as_deref().and_then(Difficulty::parse),
            cooking_time_minutes: self.cooking_time_minutes.map(|m| m.max(0) as u32),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::recipes)]
pub struct NewRecipeRow {
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub ingredients: serde_json::Value,
    pub instructions: serde_json::Value,
    pub thumbnail_url: Option<String>,
    pub source_url: String,
    pub creator: Option<String>,
    pub embedding: Vec<f32>,
    pub step0_summary: Option<String>,
    pub step0_audio_url: Option<String>,
    pub parent_recipe_id: Option<Uuid>,
    pub chefs_note: Option<String>,
    pub difficulty: Option<String>,
    pub cooking_time_minutes: Option<i32>,
}

impl TryFrom<NewRecipe> for NewRecipeRow {
    type Error = StoreError;

    fn try_from(recipe: NewRecipe) -> Result<Self, Self::Error> {
        let (step0_summary, step0_audio_url) = split_step_zero(recipe.step_zero);
        Ok(Self {
            user_id: recipe.user_id,
            title: recipe.title,
            description: recipe.description,
            ingredients: to_json(&recipe.ingredients)?,
            instructions: to_json(&recipe.instructions)?,
            thumbnail_url: recipe.thumbnail_url,
            source_url: recipe.source_url,
            creator: recipe.creator,
            embedding: recipe.embedding,
            step0_summary,
            step0_audio_url,
            parent_recipe_id: recipe.parent_recipe_id,
            chefs_note: recipe.chefs_note,
            difficulty: recipe.difficulty.map(|d| d.as_str().to_string()),
            cooking_time_minutes: recipe.cooking_time_minutes.map(minutes).transpose()?,
        })
    }
}

/// Columns a remix overwrites.
#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::recipes)]
#[diesel(treat_none_as_null = true)]
pub struct RecipeChanges {
    pub title: String,
    pub description: String,
    pub ingredients: serde_json::Value,
    pub instructions: serde_json::Value,
    pub chefs_note: Option<String>,
    pub step0_summary: Option<String>,
    pub step0_audio_url: Option<String>,
    pub difficulty: Option<String>,
    pub cooking_time_minutes: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<clipchef_core::store::RecipeUpdate> for RecipeChanges {
    type Error = StoreError;

    fn try_from(update: clipchef_core::store::RecipeUpdate) -> Result<Self, Self::Error> {
        let (step0_summary, step0_audio_url) = split_step_zero(update.step_zero);
        Ok(Self {
            title: update.title,
            description: update.description,
            ingredients: to_json(&update.ingredients)?,
            instructions: to_json(&update.instructions)?,
            chefs_note: update.chefs_note,
            step0_summary,
            step0_audio_url,
            difficulty: update.difficulty.map(|d| d.as_str().to_string()),
            cooking_time_minutes: update.cooking_time_minutes.map(minutes).transpose()?,
            updated_at: update.updated_at,
        })
    }
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::recipe_versions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RecipeVersionRow {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub version_number: i32,
    pub title: String,
    pub description: String,
    pub ingredients: serde_json::Value,
    pub instructions: serde_json::Value,
    pub chefs_note: Option<String>,
    pub changed_ingredients: Vec<String>,
    pub step0_summary: Option<String>,
    pub step0_audio_url: Option<String>,
    pub difficulty: Option<String>,
    pub cooking_time_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl RecipeVersionRow {
    pub fn into_version(self) -> Result<RecipeVersion, StoreError> {
        Ok(RecipeVersion {
            id: self.id,
            recipe_id: self.recipe_id,
            version_number: self.version_number,
            title: self.title,
            description: self.description,
            ingredients: from_json("ingredients", self.ingredients)?,
            instructions: from_json("instructions", self.instructions)?,
            chefs_note: self.chefs_note,
            changed_ingredients: self.changed_ingredients,
            step_zero: step_zero(self.step0_summary, self.step0_audio_url)?,
            difficulty: self.difficulty.as_deref().and_then(Difficulty::parse),
            cooking_time_minutes: self.cooking_time_minutes.map(|m| m.max(0) as u32),
            created_at: self.created_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::recipe_versions)]
pub struct NewRecipeVersionRow {
    pub recipe_id: Uuid,
    pub version_number: i32,
    pub title: String,
    pub description: String,
    pub ingredients: serde_json::Value,
    pub instructions: serde_json::Value,
    pub chefs_note: Option<String>,
    pub changed_ingredients: Vec<String>,
    pub step0_summary: Option<String>,
    pub step0_audio_url: Option<String>,
    pub difficulty: Option<String>,
    pub cooking_time_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<NewRecipeVersion> for NewRecipeVersionRow {
    type Error = StoreError;

    fn try_from(version: NewRecipeVersion) -> Result<Self, Self::Error> {
        let (step0_summary, step0_audio_url) = split_step_zero(version.step_zero);
        Ok(Self {
            recipe_id: version.recipe_id,
            version_number: version.version_number,
            title: version.title,
            description: version.description,
            ingredients: to_json(&version.ingredients)?,
            instructions: to_json(&version.instructions)?,
            chefs_note: version.chefs_note,
            changed_ingredients: version.changed_ingredients,
            step0_summary,
            step0_audio_url,
            difficulty: version.difficulty.map(|d| d.as_str().to_string()),
            cooking_time_minutes: version.cooking_time_minutes.map(minutes).transpose()?,
            created_at: version.created_at,
        })
    }
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::ingest_jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct IngestJob {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub status: String,
    pub current_step: Option<String>,
    pub failed_at_step: Option<String>,
    pub error_message: Option<String>,
    pub recipe_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::ingest_jobs)]
pub struct NewIngestJob<'a> {
    pub user_id: Uuid,
    pub url: &'a str,
    pub status: &'a str,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::step_outputs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)]
pub struct StepOutput {
    pub id: Uuid,
    pub ingest_job_id: Uuid,
    pub step_name: String,
    pub output: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::step_outputs)]
pub struct NewStepOutput<'a> {
    pub ingest_job_id: Uuid,
    pub step_name: &'a str,
    pub output: serde_json::Value,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::user_devices)]
pub struct NewUserDevice<'a> {
    pub user_id: Uuid,
    pub token: &'a str,
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Backend(e.to_string()))
}

fn from_json<T: DeserializeOwned>(column: &str, value: serde_json::Value) -> Result<T, StoreError> {
    serde_json::from_value(value)
        .map_err(|e| StoreError::Backend(format!("Malformed {} column: {}", column, e)))
}

fn step_zero(
    summary: Option<String>,
    audio_url: Option<String>,
) -> Result<Option<StepZero>, StoreError> {
    StepZero::from_parts(summary, audio_url).map_err(|e| StoreError::Backend(e.to_string()))
}

fn split_step_zero(step_zero: Option<StepZero>) -> (Option<String>, Option<String>) {
    match step_zero {
        Some(s) => (Some(s.summary), Some(s.audio_url)),
        None => (None, None),
    }
}

fn minutes(m: u32) -> Result<i32, StoreError> {
    i32::try_from(m)
        .map_err(|_| StoreError::Invalid(format!("cooking time {} is out of range", m)))
}

pub mod favorite;
pub mod get;
pub mod list;
pub mod versions;

use crate::AppState;
use axum::routing::{get, put};
use axum::Router;
use chrono::{DateTime, Utc};
use clipchef_core::store::Recipe;
use clipchef_core::types::{Ingredient, StepPreparation, StepZero};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

/// Returns the router for /api/recipes endpoints (mounted at /api/recipes)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::list_recipes))
        .route("/{id}", get(get::get_recipe))
        .route("/{id}/favorite", put(favorite::set_favorite))
        .route(
            "/{id}/versions",
            get(versions::list_versions).post(versions::create_remix),
        )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IngredientBody {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl From<Ingredient> for IngredientBody {
    fn from(i: Ingredient) -> Self {
        Self {
            name: i.name,
            amount: i.amount,
            unit: i.unit,
        }
    }
}

impl From<IngredientBody> for Ingredient {
    fn from(i: IngredientBody) -> Self {
        Self {
            name: i.name,
            amount: i.amount,
            unit: i.unit,
        }
    }
}

/// Spoken introduction played before the first instruction
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StepZeroBody {
    pub summary: String,
    pub audio_url: String,
}

impl From<StepZero> for StepZeroBody {
    fn from(s: StepZero) -> Self {
        Self {
            summary: s.summary,
            audio_url: s.audio_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StepPreparationBody {
    /// 1-based instruction index
    pub step: u32,
    pub ingredients: Vec<String>,
    pub equipment: Vec<String>,
    pub actions: Vec<String>,
}

impl From<StepPreparation> for StepPreparationBody {
    fn from(p: StepPreparation) -> Self {
        Self {
            step: p.step,
            ingredients: p.ingredients,
            equipment: p.equipment,
            actions: p.actions,
        }
    }
}

/// Full recipe as returned to clients. The embedding is internal and omitted.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<IngredientBody>,
    pub instructions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_zero: Option<StepZeroBody>,
    /// Absent until the background preparation pass has finished
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_preparations: Option<Vec<StepPreparationBody>>,
    pub favorite: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_recipe_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chefs_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooking_time_minutes: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Recipe> for RecipeResponse {
    fn from(r: Recipe) -> Self {
        Self {
            id: r.id,
            title: r.title,
            description: r.description,
            ingredients: r.ingredients.into_iter().map(Into::into).collect(),
            instructions: r.instructions,
            thumbnail_url: r.thumbnail_url,
            source_url: r.source_url,
            creator: r.creator,
            step_zero: r.step_zero.map(Into::into),
            step_preparations: r
                .step_preparations
                .map(|p| p.into_iter().map(Into::into).collect()),
            favorite: r.favorite,
            parent_recipe_id: r.parent_recipe_id,
            chefs_note: r.chefs_note,
            difficulty: r.difficulty.map(|d| d.as_str().to_string()),
            cooking_time_minutes: r.cooking_time_minutes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list::list_recipes,
        get::get_recipe,
        favorite::set_favorite,
        versions::list_versions,
        versions::create_remix,
    ),
    components(schemas(
        IngredientBody,
        StepZeroBody,
        StepPreparationBody,
        RecipeResponse,
        list::RecipeSummary,
        list::ListRecipesResponse,
        favorite::FavoriteRequest,
        favorite::FavoriteResponse,
        versions::RemixRequest,
        versions::VersionResponse,
        versions::VersionListResponse,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use clipchef_core::types::Difficulty;

    #[test]
    fn test_response_omits_embedding() {
        let now = Utc::now();
        let recipe = Recipe {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Shakshuka".to_string(),
            description: String::new(),
            ingredients: vec![Ingredient::named("eggs")],
            instructions: vec!["Crack eggs".to_string()],
            thumbnail_url: None,
            source_url: "https://youtu.be/x".to_string(),
            creator: None,
            embedding: vec![0.5; 4],
            step_zero: None,
            step_preparations: None,
            favorite: true,
            parent_recipe_id: None,
            chefs_note: None,
            difficulty: Some(Difficulty::Hard),
            cooking_time_minutes: Some(30),
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(RecipeResponse::from(recipe)).unwrap();
        assert!(json.get("embedding").is_none());
        assert!(json.get("step_preparations").is_none());
        assert_eq!(json["difficulty"], "hard");
        assert_eq!(json["ingredients"][0]["name"], "eggs");
    }
}

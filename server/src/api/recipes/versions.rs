use super::IngredientBody;
use crate::api::{error_response, store_error_response, version_error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use clipchef_core::store::RecipeVersion;
use clipchef_core::types::Difficulty;
use clipchef_core::versioning::{save_remix, Remix};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One saved version of a recipe
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VersionResponse {
    pub id: Uuid,
    pub version_number: i32,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<IngredientBody>,
    pub instructions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chefs_note: Option<String>,
    pub changed_ingredients: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step0_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step0_audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooking_time_minutes: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl From<RecipeVersion> for VersionResponse {
    fn from(v: RecipeVersion) -> Self {
        let (step0_summary, step0_audio_url) = match v.step_zero {
            Some(s) => (Some(s.summary), Some(s.audio_url)),
            None => (None, None),
        };
        Self {
            id: v.id,
            version_number: v.version_number,
            title: v.title,
            description: v.description,
            ingredients: v.ingredients.into_iter().map(Into::into).collect(),
            instructions: v.instructions,
            chefs_note: v.chefs_note,
            changed_ingredients: v.changed_ingredients,
            step0_summary,
            step0_audio_url,
            difficulty: v.difficulty.map(|d| d.as_str().to_string()),
            cooking_time_minutes: v.cooking_time_minutes,
            created_at: v.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VersionListResponse {
    pub versions: Vec<VersionResponse>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RemixRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub ingredients: Vec<IngredientBody>,
    pub instructions: Vec<String>,
    #[serde(default)]
    pub chefs_note: Option<String>,
    /// Names of the ingredients that differ from the previous version
    #[serde(default)]
    pub changed_ingredients: Vec<String>,
    #[serde(default)]
    pub step0_summary: Option<String>,
    #[serde(default)]
    pub step0_audio_url: Option<String>,
    /// easy, medium or hard
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub cooking_time_minutes: Option<u32>,
}

impl TryFrom<RemixRequest> for Remix {
    type Error = String;

    fn try_from(r: RemixRequest) -> Result<Self, Self::Error> {
        let difficulty = match r.difficulty {
            Some(d) => Some(
                Difficulty::parse(&d).ok_or_else(|| format!("Unknown difficulty: {}", d))?,
            ),
            None => None,
        };
        Ok(Remix {
            title: r.title,
            description: r.description,
            ingredients: r.ingredients.into_iter().map(Into::into).collect(),
            instructions: r.instructions,
            chefs_note: r.chefs_note,
            changed_ingredients: r.changed_ingredients,
            step0_summary: r.step0_summary,
            step0_audio_url: r.step0_audio_url,
            difficulty,
            cooking_time_minutes: r.cooking_time_minutes,
        })
    }
}

#[utoipa::path(
    get,
    path = "/api/recipes/{id}/versions",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Version history, newest first", body = VersionListResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_versions(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.store.list_versions(user.id, id).await {
        Ok(versions) => Json(VersionListResponse {
            versions: versions.into_iter().map(VersionResponse::from).collect(),
        })
        .into_response(),
        Err(e) => store_error_response(e),
    }
}

#[utoipa::path(
    post,
    path = "/api/recipes/{id}/versions",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    request_body = RemixRequest,
    responses(
        (status = 201, description = "Versions written by this remix, oldest first", body = VersionListResponse),
        (status = 400, description = "Invalid remix", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse),
        (status = 409, description = "Too many concurrent remixes", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_remix(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RemixRequest>,
) -> impl IntoResponse {
    let remix = match Remix::try_from(request) {
        Ok(r) => r,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, msg),
    };

    match save_remix(state.store.as_ref(), user.id, id, &remix).await {
        Ok(versions) => {
            tracing::info!(
                recipe_id = %id,
                user_id = %user.id,
                written = versions.len(),
                "remix saved"
            );
            (
                StatusCode::CREATED,
                Json(VersionListResponse {
                    versions: versions.into_iter().map(VersionResponse::from).collect(),
                }),
            )
                .into_response()
        }
        Err(e) => version_error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(difficulty: Option<&str>) -> RemixRequest {
        RemixRequest {
            title: "Spicy".to_string(),
            description: String::new(),
            ingredients: vec![IngredientBody {
                name: "chili".to_string(),
                amount: Some("2".to_string()),
                unit: None,
            }],
            instructions: vec!["Chop".to_string()],
            chefs_note: None,
            changed_ingredients: vec!["chili".to_string()],
            step0_summary: None,
            step0_audio_url: None,
            difficulty: difficulty.map(str::to_string),
            cooking_time_minutes: None,
        }
    }

    #[test]
    fn test_remix_difficulty_is_parsed() {
        let remix = Remix::try_from(request(Some("Medium"))).unwrap();
        assert_eq!(remix.difficulty, Some(Difficulty::Medium));
        assert_eq!(remix.ingredients[0].amount.as_deref(), Some("2"));

        assert!(Remix::try_from(request(Some("impossible"))).is_err());
        assert_eq!(Remix::try_from(request(None)).unwrap().difficulty, None);
    }
}

use crate::api::{store_error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FavoriteRequest {
    pub favorite: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FavoriteResponse {
    pub id: Uuid,
    pub favorite: bool,
}

#[utoipa::path(
    put,
    path = "/api/recipes/{id}/favorite",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    request_body = FavoriteRequest,
    responses(
        (status = 200, description = "Favorite flag updated", body = FavoriteResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn set_favorite(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<FavoriteRequest>,
) -> impl IntoResponse {
    match state.store.set_favorite(user.id, id, request.favorite).await {
        Ok(()) => Json(FavoriteResponse {
            id,
            favorite: request.favorite,
        })
        .into_response(),
        Err(e) => store_error_response(e),
    }
}

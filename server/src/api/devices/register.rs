use crate::api::{error_response, store_error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterDeviceRequest {
    /// Push token issued to the device
    pub token: String,
}

#[utoipa::path(
    post,
    path = "/api/devices",
    tag = "devices",
    request_body = RegisterDeviceRequest,
    responses(
        (status = 204, description = "Device registered"),
        (status = 400, description = "Missing token", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn register_device(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<RegisterDeviceRequest>,
) -> impl IntoResponse {
    let token = request.token.trim();
    if token.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Device token is required");
    }

    match state.store.register_device(user.id, token).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => store_error_response(e),
    }
}

pub mod register;

use crate::AppState;
use axum::routing::post;
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/devices endpoints (mounted at /api/devices)
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(register::register_device))
}

#[derive(OpenApi)]
#[openapi(
    paths(register::register_device),
    components(schemas(register::RegisterDeviceRequest))
)]
pub struct ApiDoc;

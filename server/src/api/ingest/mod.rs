pub mod create;
pub mod get;

use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/ingest endpoints (mounted at /api/ingest)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create::create_ingest))
        .route("/{id}", get(get::get_ingest))
}

#[derive(OpenApi)]
#[openapi(
    paths(create::create_ingest, get::get_ingest),
    components(schemas(
        create::CreateIngestRequest,
        create::CreateIngestResponse,
        get::IngestJobResponse,
    ))
)]
pub struct ApiDoc;

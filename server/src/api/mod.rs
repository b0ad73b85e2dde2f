pub mod devices;
pub mod ingest;
pub mod recipes;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clipchef_core::store::StoreError;
use clipchef_core::versioning::VersionError;
use serde::Serialize;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{OpenApi, ToSchema};

/// Shared error response used by all endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

pub fn store_error_response(e: StoreError) -> Response {
    match e {
        StoreError::NotFound => error_response(StatusCode::NOT_FOUND, "Recipe not found"),
        StoreError::Invalid(msg) => error_response(StatusCode::BAD_REQUEST, msg),
        StoreError::VersionConflict { .. } => error_response(StatusCode::CONFLICT, e.to_string()),
        StoreError::Backend(msg) => {
            tracing::error!(error = %msg, "store error");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}

pub fn version_error_response(e: VersionError) -> Response {
    match e {
        VersionError::Invalid(msg) => error_response(StatusCode::BAD_REQUEST, msg),
        VersionError::NotFound => error_response(StatusCode::NOT_FOUND, "Recipe not found"),
        VersionError::Conflict { .. } => error_response(StatusCode::CONFLICT, e.to_string()),
        VersionError::Store(e) => store_error_response(e),
    }
}

/// Generate the complete OpenAPI spec by merging all module specs
pub fn openapi() -> utoipa::openapi::OpenApi {
    #[derive(OpenApi)]
    #[openapi(components(schemas(ErrorResponse)))]
    struct BaseApi;

    let mut spec = BaseApi::openapi();

    if let Some(components) = spec.components.as_mut() {
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }

    let modules: Vec<utoipa::openapi::OpenApi> = vec![
        ingest::ApiDoc::openapi(),
        recipes::ApiDoc::openapi(),
        devices::ApiDoc::openapi(),
    ];

    for module_spec in modules {
        spec.paths.paths.extend(module_spec.paths.paths);

        if let Some(module_components) = module_spec.components {
            if let Some(spec_components) = spec.components.as_mut() {
                spec_components.schemas.extend(module_components.schemas);
            }
        }
    }

    spec
}

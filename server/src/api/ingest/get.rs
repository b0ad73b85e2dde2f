use crate::api::{error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::ingest::{self, IngestError};
use crate::models::IngestJob;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngestJobResponse {
    pub id: Uuid,
    /// pending, running, completed or failed
    pub status: String,
    pub url: String,
    /// Last step whose output was recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    /// Recipe ID if completed successfully
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<IngestJob> for IngestJobResponse {
    fn from(job: IngestJob) -> Self {
        Self {
            id: job.id,
            status: job.status,
            url: job.url,
            current_step: job.current_step,
            recipe_id: job.recipe_id,
            failed_at_step: job.failed_at_step,
            error: job.error_message,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/ingest/{id}",
    tag = "ingest",
    params(
        ("id" = Uuid, Path, description = "Ingest job ID")
    ),
    responses(
        (status = 200, description = "Ingest job status", body = IngestJobResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Job not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_ingest(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match ingest::get_job(&state.pool, user.id, id) {
        Ok(job) => Json(IngestJobResponse::from(job)).into_response(),
        Err(IngestError::JobNotFound) => error_response(StatusCode::NOT_FOUND, "Job not found"),
        Err(e) => {
            tracing::error!(job_id = %id, error = %e, "failed to fetch ingest job");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch job")
        }
    }
}

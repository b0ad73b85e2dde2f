use crate::api::{error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::ingest::{self, STEP_ENQUEUE};
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use clipchef_core::queue::IngestTask;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateIngestRequest {
    /// Short-form video URL to turn into a recipe
    pub url: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreateIngestResponse {
    /// The ingest job ID
    pub id: Uuid,
    /// Current job status
    pub status: String,
}

#[utoipa::path(
    post,
    path = "/api/ingest",
    tag = "ingest",
    request_body = CreateIngestRequest,
    responses(
        (status = 202, description = "Ingestion accepted", body = CreateIngestResponse),
        (status = 400, description = "Invalid URL", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 503, description = "Ingest queue unavailable", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_ingest(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<CreateIngestRequest>,
) -> impl IntoResponse {
    let url = match ingest::validate_url(&request.url) {
        Ok(u) => u.to_string(),
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let job = match ingest::create_job(&state.pool, user.id, &url) {
        Ok(j) => j,
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "failed to create ingest job");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create ingest job",
            );
        }
    };

    let task = IngestTask {
        job_id: job.id,
        user_id: user.id,
        url: url.clone(),
    };
    if let Err(e) = state.queue.submit(task) {
        tracing::error!(
            job_id = %job.id,
            user_id = %user.id,
            url = %url,
            error = %e,
            "ingest not enqueued"
        );
        if let Err(mark_err) =
            ingest::mark_failed(&state.pool, job.id, STEP_ENQUEUE, &e.to_string())
        {
            tracing::error!(job_id = %job.id, error = %mark_err, "failed to mark job failed");
        }
        return error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string());
    }

    tracing::info!(job_id = %job.id, user_id = %user.id, url = %url, "ingest job queued");

    (
        StatusCode::ACCEPTED,
        Json(CreateIngestResponse {
            id: job.id,
            status: job.status,
        }),
    )
        .into_response()
}

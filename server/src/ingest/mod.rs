//! Ingest job bookkeeping: the polling surface for detached ingestions.

mod output_store;
mod worker;

use chrono::Utc;
use diesel::prelude::*;
use thiserror::Error;
use uuid::Uuid;

use crate::db::DbPool;
use crate::models::{IngestJob, NewIngestJob};
use crate::schema::ingest_jobs;

pub use output_store::DbOutputStore;
pub use worker::PipelineWorker;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Job not found")]
    JobNotFound,
}

impl From<diesel::result::Error> for IngestError {
    fn from(e: diesel::result::Error) -> Self {
        IngestError::Database(e.to_string())
    }
}

impl From<diesel::r2d2::PoolError> for IngestError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        IngestError::Database(e.to_string())
    }
}

/// Job statuses
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_RUNNING: &str = "running";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";

/// Reported as the failed step when a job never reached the pipeline.
pub const STEP_ENQUEUE: &str = "enqueue";

/// Accept only absolute http(s) URLs with a host.
pub fn validate_url(raw: &str) -> Result<url::Url, IngestError> {
    let parsed = url::Url::parse(raw.trim()).map_err(|e| IngestError::InvalidUrl(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(IngestError::InvalidUrl(format!(
            "unsupported scheme: {}",
            parsed.scheme()
        )));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(IngestError::InvalidUrl("URL has no host".to_string()));
    }
    Ok(parsed)
}

pub fn create_job(pool: &DbPool, user_id: Uuid, url: &str) -> Result<IngestJob, IngestError> {
    let mut conn = pool.get()?;
    Ok(diesel::insert_into(ingest_jobs::table)
        .values(&NewIngestJob {
            user_id,
            url,
            status: STATUS_PENDING,
        })
        .returning(IngestJob::as_returning())
        .get_result(&mut conn)?)
}

/// Fetch a job owned by `user_id`.
pub fn get_job(pool: &DbPool, user_id: Uuid, job_id: Uuid) -> Result<IngestJob, IngestError> {
    let mut conn = pool.get()?;
    ingest_jobs::table
        .filter(ingest_jobs::id.eq(job_id))
        .filter(ingest_jobs::user_id.eq(user_id))
        .select(IngestJob::as_select())
        .first(&mut conn)
        .optional()?
        .ok_or(IngestError::JobNotFound)
}

pub fn mark_running(pool: &DbPool, job_id: Uuid) -> Result<(), IngestError> {
    let mut conn = pool.get()?;
    diesel::update(ingest_jobs::table.find(job_id))
        .set((
            ingest_jobs::status.eq(STATUS_RUNNING),
            ingest_jobs::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;
    Ok(())
}

pub fn mark_completed(pool: &DbPool, job_id: Uuid, recipe_id: Uuid) -> Result<(), IngestError> {
    let mut conn = pool.get()?;
    diesel::update(ingest_jobs::table.find(job_id))
        .set((
            ingest_jobs::status.eq(STATUS_COMPLETED),
            ingest_jobs::recipe_id.eq(Some(recipe_id)),
            ingest_jobs::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;
    Ok(())
}

pub fn mark_failed(pool: &DbPool, job_id: Uuid, step: &str, error: &str) -> Result<(), IngestError> {
    let mut conn = pool.get()?;
    diesel::update(ingest_jobs::table.find(job_id))
        .set((
            ingest_jobs::status.eq(STATUS_FAILED),
            ingest_jobs::failed_at_step.eq(Some(step)),
            ingest_jobs::error_message.eq(Some(error)),
            ingest_jobs::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;
    Ok(())
}

use std::sync::Arc;

use async_trait::async_trait;
use clipchef_core::ingest::{run_ingestion, IngestServices};
use clipchef_core::precompute::spawn_precompute;
use clipchef_core::queue::{IngestHandler, IngestTask};
use tracing::Instrument;

use crate::db::DbPool;

use super::{mark_completed, mark_failed, mark_running, DbOutputStore};

/// Runs queued ingestions and records their outcome on the job row.
pub struct PipelineWorker {
    pool: Arc<DbPool>,
    services: IngestServices,
}

impl PipelineWorker {
    pub fn new(pool: Arc<DbPool>, services: IngestServices) -> Self {
        Self { pool, services }
    }

    async fn process(&self, task: IngestTask) {
        if let Err(e) = mark_running(&self.pool, task.job_id) {
            tracing::error!(error = %e, "failed to mark job running");
        }

        let mut outputs = DbOutputStore::new(&self.pool, task.job_id);
        let outcome = run_ingestion(&self.services, task.user_id, &task.url, &mut outputs).await;

        match outcome.recipe_id {
            Some(recipe_id) => {
                if let Err(e) = mark_completed(&self.pool, task.job_id, recipe_id) {
                    tracing::error!(%recipe_id, error = %e, "failed to mark job completed");
                }
                // Detached tail: the recipe is already visible.
                spawn_precompute(
                    self.services.content.clone(),
                    self.services.store.clone(),
                    task.user_id,
                    recipe_id,
                    self.services.config.service_timeout,
                );
            }
            None => {
                let step = outcome.failed_step.as_deref().unwrap_or("unknown");
                let error = outcome.error.as_deref().unwrap_or("unknown error");
                tracing::error!(step, error, "ingestion job failed");
                if let Err(e) = mark_failed(&self.pool, task.job_id, step, error) {
                    tracing::error!(error = %e, "failed to mark job failed");
                }
            }
        }
    }
}

#[async_trait]
impl IngestHandler for PipelineWorker {
    async fn handle(&self, task: IngestTask) {
        let span = tracing::info_span!(
            "ingest_job",
            job_id = %task.job_id,
            user_id = %task.user_id,
            url = %task.url,
        );
        self.process(task).instrument(span).await;
    }
}

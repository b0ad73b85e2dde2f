//! Database-backed step output store.

use std::error::Error;

use chrono::Utc;
use clipchef_core::pipeline::StepOutputStore;
use diesel::prelude::*;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::db::DbPool;
use crate::models::{NewStepOutput, StepOutput};
use crate::schema::{ingest_jobs, step_outputs};

/// Stores step outputs in `step_outputs`, keyed by job and step name, and
/// advances the job's `current_step` as each output lands.
pub struct DbOutputStore<'a> {
    pool: &'a DbPool,
    job_id: Uuid,
}

impl<'a> DbOutputStore<'a> {
    pub fn new(pool: &'a DbPool, job_id: Uuid) -> Self {
        Self { pool, job_id }
    }
}

impl StepOutputStore for DbOutputStore<'_> {
    fn get_output(&self, step_name: &str) -> Option<JsonValue> {
        let mut conn = self.pool.get().ok()?;

        step_outputs::table
            .filter(step_outputs::ingest_job_id.eq(self.job_id))
            .filter(step_outputs::step_name.eq(step_name))
            .order(step_outputs::created_at.desc())
            .select(StepOutput::as_select())
            .first(&mut conn)
            .optional()
            .ok()?
            .map(|output| output.output)
    }

    fn save_output(
        &mut self,
        step_name: &str,
        output: &JsonValue,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::insert_into(step_outputs::table)
                .values(&NewStepOutput {
                    ingest_job_id: self.job_id,
                    step_name,
                    output: output.clone(),
                })
                .execute(conn)?;

            diesel::update(ingest_jobs::table.find(self.job_id))
                .set((
                    ingest_jobs::current_step.eq(Some(step_name)),
                    ingest_jobs::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;
            Ok(())
        })?;

        Ok(())
    }
}

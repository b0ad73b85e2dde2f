//! Pipeline step trait and supporting types.

use std::error::Error;
use std::time::Instant;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Metadata about a pipeline step.
#[derive(Debug, Clone)]
pub struct StepMetadata {
    /// Unique identifier for this step (e.g., "extract_recipe", "save_recipe")
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// If true, failures don't fail the overall pipeline
    pub continues_on_failure: bool,
}

/// Result of executing a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Name of the step that produced this result
    pub step_name: String,
    /// Whether the step succeeded
    pub success: bool,
    /// The output data (JSON)
    pub output: JsonValue,
    /// Error message if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// How long the step took in milliseconds
    pub duration_ms: u64,
    /// Name of the next step to run (the step decides what's next)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<String>,
}

impl StepResult {
    /// A successful result carrying `output`.
    pub fn succeeded<T: Serialize>(
        step_name: &str,
        output: &T,
        next_step: Option<&str>,
        started: Instant,
    ) -> Self {
        match serde_json::to_value(output) {
            Ok(output) => Self {
                step_name: step_name.to_string(),
                success: true,
                output,
                error: None,
                duration_ms: started.elapsed().as_millis() as u64,
                next_step: next_step.map(str::to_string),
            },
            Err(e) => Self::failed(
                step_name,
                format!("Failed to serialize output: {}", e),
                started,
            ),
        }
    }

    pub fn failed(step_name: &str, error: impl Into<String>, started: Instant) -> Self {
        let error = error.into();
        Self {
            step_name: step_name.to_string(),
            success: false,
            output: serde_json::json!({ "error": error }),
            error: Some(error),
            duration_ms: started.elapsed().as_millis() as u64,
            next_step: None,
        }
    }
}

/// Abstraction for reading/writing step outputs.
/// Implemented in memory by core and against the database by the server.
pub trait StepOutputStore: Send + Sync {
    /// Get the output from a previous step by name.
    fn get_output(&self, step_name: &str) -> Option<JsonValue>;

    /// Save the output from a step.
    fn save_output(
        &mut self,
        step_name: &str,
        output: &JsonValue,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Context provided to steps during execution.
pub struct StepContext<'a> {
    /// URL being processed
    pub url: &'a str,
    /// Access to prior step outputs
    pub outputs: &'a dyn StepOutputStore,
}

impl StepContext<'_> {
    /// Deserialize a prior step's output.
    pub fn output<T: DeserializeOwned>(&self, step_name: &str) -> Result<T, String> {
        let value = self
            .outputs
            .get_output(step_name)
            .ok_or_else(|| format!("No {} output found", step_name))?;
        serde_json::from_value(value)
            .map_err(|e| format!("Invalid {} output: {}", step_name, e))
    }
}

/// The main trait for pipeline steps.
#[async_trait]
pub trait PipelineStep: Send + Sync {
    /// Return metadata about this step.
    fn metadata(&self) -> StepMetadata;

    /// Execute the step. Failures are reported in the result, never by panicking.
    async fn execute(&self, ctx: &StepContext<'_>) -> StepResult;
}

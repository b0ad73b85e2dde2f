//! In-memory step output store.

use std::collections::HashMap;
use std::error::Error;

use serde_json::Value as JsonValue;

use super::StepOutputStore;

/// Keeps step outputs for the lifetime of one pipeline run.
#[derive(Debug, Default)]
pub struct MemoryOutputStore {
    outputs: HashMap<String, JsonValue>,
    order: Vec<String>,
}

impl MemoryOutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the steps whose output was saved, in order.
    pub fn saved_steps(&self) -> &[String] {
        &self.order
    }
}

impl StepOutputStore for MemoryOutputStore {
    fn get_output(&self, step_name: &str) -> Option<JsonValue> {
        self.outputs.get(step_name).cloned()
    }

    fn save_output(
        &mut self,
        step_name: &str,
        output: &JsonValue,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.outputs.insert(step_name.to_string(), output.clone());
        self.order.push(step_name.to_string());
        Ok(())
    }
}

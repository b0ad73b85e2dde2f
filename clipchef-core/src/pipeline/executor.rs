//! Pipeline executor and step registry.

use std::collections::HashMap;

use tracing::{info_span, Instrument};

use crate::pipeline::step::{PipelineStep, StepContext, StepOutputStore, StepResult};

/// Registry that maps step names to their implementations.
pub struct StepRegistry {
    steps: HashMap<String, Box<dyn PipelineStep>>,
}

impl StepRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            steps: HashMap::new(),
        }
    }

    /// Register a step implementation.
    pub fn register(&mut self, step: Box<dyn PipelineStep>) {
        self.steps.insert(step.metadata().name.to_string(), step);
    }

    /// Get a step by name.
    pub fn get(&self, name: &str) -> Option<&dyn PipelineStep> {
        self.steps.get(name).map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a pipeline starting from the given step.
///
/// The executor follows the step-driven chain: each step returns `next_step`
/// to indicate what should run next. This continues until a step returns
/// `next_step: None` or a step fails (unless it has `continues_on_failure`).
pub async fn run_pipeline(
    first_step_name: &str,
    url: &str,
    store: &mut dyn StepOutputStore,
    registry: &StepRegistry,
) -> Vec<StepResult> {
    let mut results = Vec::new();
    let mut current_step_name = Some(first_step_name.to_string());

    while let Some(step_name) = current_step_name {
        let Some(step) = registry.get(&step_name) else {
            tracing::warn!(step = %step_name, "unknown pipeline step, stopping");
            break;
        };

        let meta = step.metadata();
        let ctx = StepContext {
            url,
            outputs: store,
        };
        let result = step
            .execute(&ctx)
            .instrument(info_span!("pipeline_step", step = %step_name))
            .await;

        if result.success {
            let _save_span = info_span!("save_output", step = %step_name).entered();
            if let Err(e) = store.save_output(meta.name, &result.output) {
                // The in-flight result is still used; only diagnosis loses it.
                tracing::warn!(step = meta.name, error = %e, "failed to save step output");
            }
        } else {
            tracing::warn!(
                step = meta.name,
                error = result.error.as_deref().unwrap_or("unknown"),
                continues = meta.continues_on_failure,
                "pipeline step failed"
            );
        }

        let should_continue = result.success || meta.continues_on_failure;
        let next = result.next_step.clone();
        results.push(result);

        if !should_continue {
            break;
        }

        current_step_name = next;
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{MemoryOutputStore, StepMetadata};
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Instant;

    struct FixedStep {
        name: &'static str,
        success: bool,
        continues_on_failure: bool,
        next: Option<&'static str>,
    }

    #[async_trait]
    impl PipelineStep for FixedStep {
        fn metadata(&self) -> StepMetadata {
            StepMetadata {
                name: self.name,
                description: "test step",
                continues_on_failure: self.continues_on_failure,
            }
        }

        async fn execute(&self, _ctx: &StepContext<'_>) -> StepResult {
            let started = Instant::now();
            if self.success {
                StepResult::succeeded(self.name, &json!({ "ran": self.name }), self.next, started)
            } else {
                let mut result = StepResult::failed(self.name, "boom", started);
                result.next_step = self.next.map(str::to_string);
                result
            }
        }
    }

    fn registry(steps: Vec<FixedStep>) -> StepRegistry {
        let mut registry = StepRegistry::new();
        for step in steps {
            registry.register(Box::new(step));
        }
        registry
    }

    #[tokio::test]
    async fn test_follows_chain_and_saves_outputs() {
        let registry = registry(vec![
            FixedStep { name: "a", success: true, continues_on_failure: false, next: Some("b") },
            FixedStep { name: "b", success: true, continues_on_failure: false, next: None },
        ]);
        let mut store = MemoryOutputStore::new();

        let results = run_pipeline("a", "https://x.test", &mut store, &registry).await;

        assert_eq!(results.len(), 2);
        assert_eq!(store.get_output("b"), Some(json!({ "ran": "b" })));
    }

    #[tokio::test]
    async fn test_fatal_failure_stops() {
        let registry = registry(vec![
            FixedStep { name: "a", success: false, continues_on_failure: false, next: Some("b") },
            FixedStep { name: "b", success: true, continues_on_failure: false, next: None },
        ]);
        let mut store = MemoryOutputStore::new();

        let results = run_pipeline("a", "https://x.test", &mut store, &registry).await;

        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert!(store.get_output("a").is_none());
    }

    #[tokio::test]
    async fn test_best_effort_failure_continues() {
        let registry = registry(vec![
            FixedStep { name: "a", success: false, continues_on_failure: true, next: Some("b") },
            FixedStep { name: "b", success: true, continues_on_failure: false, next: None },
        ]);
        let mut store = MemoryOutputStore::new();

        let results = run_pipeline("a", "https://x.test", &mut store, &registry).await;
        assert_eq!(results.len(), 2);
        assert!(results[1].success);
    }
}

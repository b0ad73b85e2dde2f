//! Wiring for one ingestion: the services the steps need, the step registry,
//! and a runner that reports what happened.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::ai::ContentService;
use crate::config::{self, ConfigError};
use crate::extract::ContentExtractor;
use crate::media::MediaResolver;
use crate::notify::Notifier;
use crate::pipeline::steps::{
    ExtractRecipeStep, GenerateEmbeddingStep, NotifyDevicesStep, PersistThumbnailStep,
    SaveRecipeStep, SynthesizeNarrationStep,
};
use crate::pipeline::{run_pipeline, StepOutputStore, StepRegistry, StepResult};
use crate::storage::ObjectStorage;
use crate::store::RecipeStore;
use crate::types::SaveRecipeOutput;

pub const DEFAULT_SERVICE_TIMEOUT_SECS: u64 = 180;

#[derive(Debug, Clone, Copy)]
pub struct IngestConfig {
    /// Upper bound for each content-service call.
    pub service_timeout: Duration,
    /// Upper bound for each retrieval call (thumbnails; videos use the resolver's own).
    pub download_timeout: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            service_timeout: Duration::from_secs(DEFAULT_SERVICE_TIMEOUT_SECS),
            download_timeout: Duration::from_secs(crate::media::DEFAULT_DOWNLOAD_TIMEOUT_SECS),
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            service_timeout: config::secs_or(
                "CLIPCHEF_EXTRACT_TIMEOUT_SECS",
                DEFAULT_SERVICE_TIMEOUT_SECS,
            )?,
            download_timeout: config::secs_or(
                "CLIPCHEF_DOWNLOAD_TIMEOUT_SECS",
                crate::media::DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            )?,
        })
    }
}

/// Long-lived collaborators shared by every ingestion.
#[derive(Clone)]
pub struct IngestServices {
    pub content: Arc<dyn ContentService>,
    pub resolver: Arc<MediaResolver>,
    pub extractor: Arc<ContentExtractor>,
    pub storage: Arc<dyn ObjectStorage>,
    pub store: Arc<dyn RecipeStore>,
    pub notifier: Arc<dyn Notifier>,
    pub config: IngestConfig,
}

impl IngestServices {
    pub fn new(
        content: Arc<dyn ContentService>,
        resolver: Arc<MediaResolver>,
        storage: Arc<dyn ObjectStorage>,
        store: Arc<dyn RecipeStore>,
        notifier: Arc<dyn Notifier>,
        config: IngestConfig,
    ) -> Self {
        let extractor = Arc::new(ContentExtractor::new(content.clone(), config.service_timeout));
        Self {
            content,
            resolver,
            extractor,
            storage,
            store,
            notifier,
            config,
        }
    }
}

/// Build the ingestion step registry for one user.
pub fn build_registry(services: &IngestServices, user_id: Uuid) -> StepRegistry {
    let mut registry = StepRegistry::new();
    registry.register(Box::new(ExtractRecipeStep::new(
        services.resolver.clone(),
        services.extractor.clone(),
    )));
    registry.register(Box::new(PersistThumbnailStep::new(
        services.resolver.retriever().clone(),
        services.storage.clone(),
        services.config.download_timeout,
    )));
    registry.register(Box::new(GenerateEmbeddingStep::new(
        services.content.clone(),
        services.config.service_timeout,
    )));
    registry.register(Box::new(SynthesizeNarrationStep::new(
        services.content.clone(),
        services.storage.clone(),
        services.config.service_timeout,
    )));
    registry.register(Box::new(SaveRecipeStep::new(services.store.clone(), user_id)));
    registry.register(Box::new(NotifyDevicesStep::new(
        services.store.clone(),
        services.notifier.clone(),
        user_id,
    )));
    registry
}

/// What an ingestion produced.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub results: Vec<StepResult>,
    /// Set when the recipe was saved.
    pub recipe_id: Option<Uuid>,
    /// The step that stopped the pipeline, when it was stopped.
    pub failed_step: Option<String>,
    pub error: Option<String>,
}

impl IngestOutcome {
    fn from_results(results: Vec<StepResult>) -> Self {
        let recipe_id = results
            .iter()
            .find(|r| r.step_name == SaveRecipeStep::NAME && r.success)
            .and_then(|r| serde_json::from_value::<SaveRecipeOutput>(r.output.clone()).ok())
            .map(|o| o.recipe_id);

        let (failed_step, error) = if recipe_id.is_some() {
            (None, None)
        } else {
            match results.iter().rev().find(|r| !r.success) {
                Some(r) => (Some(r.step_name.clone()), r.error.clone()),
                None => (None, Some("pipeline stopped before saving".to_string())),
            }
        };

        Self {
            results,
            recipe_id,
            failed_step,
            error,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.recipe_id.is_some()
    }
}

/// Run the full ingestion for `url`. Step outputs are written to `outputs`.
pub async fn run_ingestion(
    services: &IngestServices,
    user_id: Uuid,
    url: &str,
    outputs: &mut dyn StepOutputStore,
) -> IngestOutcome {
    let registry = build_registry(services, user_id);
    let results = run_pipeline(ExtractRecipeStep::NAME, url, outputs, &registry).await;
    let outcome = IngestOutcome::from_results(results);

    match (&outcome.recipe_id, &outcome.failed_step) {
        (Some(recipe_id), _) => {
            tracing::info!(%user_id, url, %recipe_id, "ingestion completed");
        }
        (None, step) => {
            tracing::error!(
                %user_id,
                url,
                step = step.as_deref().unwrap_or("unknown"),
                error = outcome.error.as_deref().unwrap_or("unknown"),
                "ingestion failed"
            );
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::FakeContentService;
    use crate::media::{DirectDomains, FakeRetriever};
    use crate::notify::RecordingNotifier;
    use crate::pipeline::MemoryOutputStore;
    use crate::storage::MemoryStorage;
    use crate::store::MemoryRecipeStore;

    #[test]
    fn test_registry_has_every_step() {
        let services = IngestServices::new(
            Arc::new(FakeContentService::default()),
            Arc::new(MediaResolver::new(
                Arc::new(FakeRetriever::new()),
                DirectDomains::default(),
                Duration::from_secs(5),
            )),
            Arc::new(MemoryStorage::new()),
            Arc::new(MemoryRecipeStore::new()),
            Arc::new(RecordingNotifier::new()),
            IngestConfig::default(),
        );
        let registry = build_registry(&services, Uuid::new_v4());
        assert_eq!(registry.len(), 6);
        assert!(registry.get(NotifyDevicesStep::NAME).is_some());
    }

    #[tokio::test]
    async fn test_outcome_reports_failed_step() {
        let services = IngestServices::new(
            Arc::new(FakeContentService::default().fail_embedding()),
            Arc::new(MediaResolver::new(
                Arc::new(FakeRetriever::new()),
                DirectDomains::default(),
                Duration::from_secs(5),
            )),
            Arc::new(MemoryStorage::new()),
            Arc::new(MemoryRecipeStore::new()),
            Arc::new(RecordingNotifier::new()),
            IngestConfig::default(),
        );

        let mut outputs = MemoryOutputStore::new();
        let outcome =
            run_ingestion(&services, Uuid::new_v4(), "https://youtu.be/abc", &mut outputs).await;

        assert!(!outcome.succeeded());
        assert_eq!(outcome.failed_step.as_deref(), Some(GenerateEmbeddingStep::NAME));
        assert!(outcome.error.is_some());
    }
}

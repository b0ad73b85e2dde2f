//! Step-driven pipeline framework for recipe ingestion.
//!
//! - Steps are defined via the `PipelineStep` trait
//! - Each step returns `next_step` to indicate what runs next
//! - Step outputs are saved to a `StepOutputStore` (memory here, database on
//!   the server) so later steps and post-hoc diagnosis can read them

mod executor;
mod output_store;
mod step;
pub mod steps;

pub use executor::{run_pipeline, StepRegistry};
pub use output_store::MemoryOutputStore;
pub use step::{PipelineStep, StepContext, StepMetadata, StepOutputStore, StepResult};

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::steps::{
        ExtractRecipeStep, GenerateEmbeddingStep, NotifyDevicesStep, PersistThumbnailStep,
        SaveRecipeStep, SynthesizeNarrationStep,
    };

    #[test]
    fn step_names_are_unique() {
        let names = [
            ExtractRecipeStep::NAME,
            PersistThumbnailStep::NAME,
            GenerateEmbeddingStep::NAME,
            SynthesizeNarrationStep::NAME,
            SaveRecipeStep::NAME,
            NotifyDevicesStep::NAME,
        ];

        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(
            names.len(),
            unique.len(),
            "Duplicate step names detected! Names: {:?}",
            names
        );
    }
}

//! Ingestion pipeline steps, in execution order.

mod extract_recipe;
mod generate_embedding;
mod notify_devices;
mod persist_thumbnail;
mod save_recipe;
mod synthesize_narration;

pub use extract_recipe::ExtractRecipeStep;
pub use generate_embedding::GenerateEmbeddingStep;
pub use notify_devices::NotifyDevicesStep;
pub use persist_thumbnail::PersistThumbnailStep;
pub use save_recipe::SaveRecipeStep;
pub use synthesize_narration::SynthesizeNarrationStep;

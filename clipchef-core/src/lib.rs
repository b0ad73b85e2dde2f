pub mod ai;
pub mod artifacts;
pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod image;
pub mod ingest;
pub mod media;
pub mod notify;
pub mod pipeline;
pub mod precompute;
pub mod queue;
pub mod storage;
pub mod store;
pub mod types;
pub mod versioning;

pub use error::{ExtractError, FetchError};
pub use extract::{ContentExtractor, Extraction, ExtractionFailure};
pub use http::{HttpClient, MockClient};
pub use image::{validate_image, MAX_FILE_SIZE};
pub use ingest::{build_registry, run_ingestion, IngestConfig, IngestOutcome, IngestServices};
pub use media::{MediaResolver, Strategy};
pub use queue::{IngestHandler, IngestQueue, IngestTask, QueueConfig, QueueError};
pub use store::{Recipe, RecipeStore, RecipeVersion, StoreError};
pub use types::{
    Difficulty, ExtractRecipeOutput, GenerateEmbeddingOutput, Ingredient, NotifyDevicesOutput,
    PersistThumbnailOutput, RecipeDraft, SaveRecipeOutput, StepPreparation, StepZero,
    SynthesizeNarrationOutput,
};
pub use versioning::{save_remix, Remix, VersionError};

//! End-to-end ingestion runs against in-memory services.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use clipchef_core::ai::{FakeCall, FakeContentService};
use clipchef_core::ingest::{run_ingestion, IngestConfig, IngestServices};
use clipchef_core::media::{DirectDomains, FakeRetriever, MediaResolver};
use clipchef_core::notify::RecordingNotifier;
use clipchef_core::pipeline::MemoryOutputStore;
use clipchef_core::precompute::spawn_precompute;
use clipchef_core::storage::{MemoryStorage, AUDIO_BUCKET, THUMBNAIL_BUCKET};
use clipchef_core::store::{MemoryRecipeStore, RecipeStore};
use clipchef_core::Strategy;
use uuid::Uuid;

const YOUTUBE_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
const TIKTOK_URL: &str = "https://www.tiktok.com/@chef/video/123";

struct Harness {
    content: Arc<FakeContentService>,
    retriever: Arc<FakeRetriever>,
    storage: Arc<MemoryStorage>,
    store: Arc<MemoryRecipeStore>,
    notifier: Arc<RecordingNotifier>,
    services: IngestServices,
}

impl Harness {
    fn new(content: FakeContentService, retriever: FakeRetriever) -> Self {
        Self::with_storage(content, retriever, MemoryStorage::new())
    }

    fn with_storage(
        content: FakeContentService,
        retriever: FakeRetriever,
        storage: MemoryStorage,
    ) -> Self {
        let content = Arc::new(content);
        let retriever = Arc::new(retriever);
        let storage = Arc::new(storage);
        let store = Arc::new(MemoryRecipeStore::new());
        let notifier = Arc::new(RecordingNotifier::new());

        let resolver = Arc::new(MediaResolver::new(
            retriever.clone(),
            DirectDomains::default(),
            Duration::from_secs(30),
        ));
        let services = IngestServices::new(
            content.clone(),
            resolver,
            storage.clone(),
            store.clone(),
            notifier.clone(),
            IngestConfig {
                service_timeout: Duration::from_secs(30),
                download_timeout: Duration::from_secs(30),
            },
        );

        Self {
            content,
            retriever,
            storage,
            store,
            notifier,
            services,
        }
    }
}

fn png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 80, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

#[tokio::test]
async fn test_full_ingestion_saves_one_recipe() {
    let h = Harness::new(
        FakeContentService::default(),
        FakeRetriever::new().with_thumbnail(png()),
    );
    let user_id = Uuid::new_v4();
    h.store.register_device(user_id, "ExponentPushToken[1]").await.unwrap();

    let mut outputs = MemoryOutputStore::new();
    let outcome = run_ingestion(&h.services, user_id, YOUTUBE_URL, &mut outputs).await;

    assert!(outcome.succeeded(), "ingestion failed: {:?}", outcome.error);
    assert_eq!(h.store.recipe_count(), 1);

    let recipe_id = outcome.recipe_id.unwrap();
    let recipe = h.store.get_recipe(user_id, recipe_id).await.unwrap();
    assert_eq!(recipe.title, "Pasta v1");
    assert_eq!(recipe.source_url, YOUTUBE_URL);
    assert!(!recipe.embedding.is_empty());
    assert!(recipe
        .thumbnail_url
        .as_deref()
        .unwrap()
        .contains("/recipe-thumbnails/"));
    assert_eq!(h.storage.names(THUMBNAIL_BUCKET).len(), 1);

    let step_zero = recipe.step_zero.expect("step zero should be present");
    assert_eq!(step_zero.summary, "A quick tomato pasta for busy nights.");
    assert!(step_zero.audio_url.contains("/step0-audio/"));
    assert_eq!(h.storage.names(AUDIO_BUCKET).len(), 1);

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.recipe_id, recipe_id);
    assert_eq!(sent[0].1.body, "Pasta v1");

    assert_eq!(
        outputs.saved_steps(),
        &[
            "extract_recipe",
            "persist_thumbnail",
            "generate_embedding",
            "synthesize_narration",
            "save_recipe",
            "notify_devices",
        ]
    );

    // Direct understanding on an allow-listed host: nothing was downloaded.
    assert_eq!(h.retriever.media_fetches(), 0);
}

#[tokio::test]
async fn test_embedding_failure_saves_nothing() {
    let h = Harness::new(
        FakeContentService::default().fail_embedding(),
        FakeRetriever::new().with_thumbnail(png()),
    );
    let user_id = Uuid::new_v4();
    h.store.register_device(user_id, "tok").await.unwrap();

    let mut outputs = MemoryOutputStore::new();
    let outcome = run_ingestion(&h.services, user_id, YOUTUBE_URL, &mut outputs).await;

    assert!(!outcome.succeeded());
    assert_eq!(outcome.failed_step.as_deref(), Some("generate_embedding"));
    assert_eq!(h.store.recipe_count(), 0);
    assert!(h.notifier.sent().is_empty());
    assert!(!h
        .content
        .calls()
        .iter()
        .any(|c| matches!(c, FakeCall::Speech(_))));
}

#[tokio::test]
async fn test_empty_embedding_saves_nothing() {
    let h = Harness::new(
        FakeContentService::default().empty_embedding(),
        FakeRetriever::new(),
    );

    let mut outputs = MemoryOutputStore::new();
    let outcome = run_ingestion(&h.services, Uuid::new_v4(), YOUTUBE_URL, &mut outputs).await;

    assert_eq!(outcome.failed_step.as_deref(), Some("generate_embedding"));
    assert_eq!(h.store.recipe_count(), 0);
}

#[tokio::test]
async fn test_thumbnail_failure_keeps_original_reference() {
    // No thumbnail bytes: the re-host fetch fails.
    let h = Harness::new(FakeContentService::default(), FakeRetriever::new());
    let user_id = Uuid::new_v4();

    let mut outputs = MemoryOutputStore::new();
    let outcome = run_ingestion(&h.services, user_id, YOUTUBE_URL, &mut outputs).await;

    assert!(outcome.succeeded());
    let recipe = h
        .store
        .get_recipe(user_id, outcome.recipe_id.unwrap())
        .await
        .unwrap();
    assert_eq!(
        recipe.thumbnail_url.as_deref(),
        Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg")
    );
    assert!(h.storage.names(THUMBNAIL_BUCKET).is_empty());
}

#[tokio::test]
async fn test_direct_failure_falls_back_and_removes_download() {
    let h = Harness::new(
        FakeContentService::default().fail_remote(),
        FakeRetriever::new()
            .with_description("Full recipe in the caption")
            .with_creator("chef_anna"),
    );
    let user_id = Uuid::new_v4();

    let mut outputs = MemoryOutputStore::new();
    let outcome = run_ingestion(&h.services, user_id, YOUTUBE_URL, &mut outputs).await;
    assert!(outcome.succeeded());

    let extract: clipchef_core::ExtractRecipeOutput =
        serde_json::from_value(outcome.results[0].output.clone()).unwrap();
    assert_eq!(extract.strategy_used, Strategy::Download);
    assert_eq!(extract.attempts.len(), 2);
    assert!(!extract.attempts[0].success);
    assert!(extract.attempts[1].success);

    let calls = h.content.calls();
    assert!(calls.iter().any(|c| matches!(
        c,
        FakeCall::UnderstandInline { auxiliary: Some(a), .. } if a == "Full recipe in the caption"
    )));

    let recipe = h
        .store
        .get_recipe(user_id, outcome.recipe_id.unwrap())
        .await
        .unwrap();
    assert_eq!(recipe.creator.as_deref(), Some("chef_anna"));

    let paths = h.retriever.created_paths();
    assert_eq!(paths.len(), 1);
    assert!(paths.iter().all(|p| !p.exists()), "temp media left behind");
}

#[tokio::test]
async fn test_unlisted_host_downloads_first() {
    let h = Harness::new(FakeContentService::default(), FakeRetriever::new());

    let mut outputs = MemoryOutputStore::new();
    let outcome = run_ingestion(&h.services, Uuid::new_v4(), TIKTOK_URL, &mut outputs).await;

    assert!(outcome.succeeded());
    assert_eq!(h.retriever.media_fetches(), 1);
    assert!(!h
        .content
        .calls()
        .iter()
        .any(|c| matches!(c, FakeCall::UnderstandRemote { .. })));
    assert!(h.retriever.created_paths().iter().all(|p| !p.exists()));
}

#[tokio::test]
async fn test_download_failure_is_final() {
    let h = Harness::new(
        FakeContentService::default().fail_remote(),
        FakeRetriever::new().fail_media(),
    );

    let mut outputs = MemoryOutputStore::new();
    let outcome = run_ingestion(&h.services, Uuid::new_v4(), YOUTUBE_URL, &mut outputs).await;

    assert!(!outcome.succeeded());
    assert_eq!(outcome.failed_step.as_deref(), Some("extract_recipe"));
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(h.retriever.media_fetches(), 1);
    assert_eq!(h.store.recipe_count(), 0);
}

#[tokio::test]
async fn test_speech_failure_drops_step_zero_pair() {
    let h = Harness::new(
        FakeContentService::default().fail_speech(),
        FakeRetriever::new(),
    );
    let user_id = Uuid::new_v4();

    let mut outputs = MemoryOutputStore::new();
    let outcome = run_ingestion(&h.services, user_id, YOUTUBE_URL, &mut outputs).await;

    assert!(outcome.succeeded());
    let recipe = h
        .store
        .get_recipe(user_id, outcome.recipe_id.unwrap())
        .await
        .unwrap();
    assert!(recipe.step_zero.is_none());
    assert!(h.storage.names(AUDIO_BUCKET).is_empty());
}

#[tokio::test]
async fn test_storage_outage_still_saves_recipe() {
    let h = Harness::with_storage(
        FakeContentService::default(),
        FakeRetriever::new().with_thumbnail(png()),
        MemoryStorage::failing(),
    );
    let user_id = Uuid::new_v4();

    let mut outputs = MemoryOutputStore::new();
    let outcome = run_ingestion(&h.services, user_id, YOUTUBE_URL, &mut outputs).await;

    assert!(outcome.succeeded());
    let recipe = h
        .store
        .get_recipe(user_id, outcome.recipe_id.unwrap())
        .await
        .unwrap();
    assert!(recipe.step_zero.is_none());
    assert!(recipe
        .thumbnail_url
        .as_deref()
        .unwrap()
        .starts_with("https://i.ytimg.com/"));
}

#[tokio::test]
async fn test_precompute_after_save() {
    let h = Harness::new(
        FakeContentService::default().with_completion(
            clipchef_core::ai::prompts::STEP_PREPARATION_PROMPT_NAME,
            r#"{"steps": [
                {"step": 2, "ingredients": ["tomato"], "equipment": ["pan"], "actions": ["Warm the sauce"]},
                {"step": 1, "ingredients": ["spaghetti"], "equipment": ["pot"], "actions": ["Salt the water"]}
            ]}"#,
        ),
        FakeRetriever::new(),
    );
    let user_id = Uuid::new_v4();

    let mut outputs = MemoryOutputStore::new();
    let outcome = run_ingestion(&h.services, user_id, YOUTUBE_URL, &mut outputs).await;
    let recipe_id = outcome.recipe_id.unwrap();

    // Visible before precompute runs.
    let before = h.store.get_recipe(user_id, recipe_id).await.unwrap();
    assert!(before.step_preparations.is_none());

    spawn_precompute(
        h.content.clone(),
        h.store.clone(),
        user_id,
        recipe_id,
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    let after = h.store.get_recipe(user_id, recipe_id).await.unwrap();
    let steps = after.step_preparations.unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].step, 1);
    assert_eq!(steps[0].equipment, vec!["pot"]);
}

#[tokio::test]
async fn test_failed_precompute_leaves_recipe_intact() {
    // No completion registered: the content service errors.
    let h = Harness::new(FakeContentService::default(), FakeRetriever::new());
    let user_id = Uuid::new_v4();

    let mut outputs = MemoryOutputStore::new();
    let outcome = run_ingestion(&h.services, user_id, YOUTUBE_URL, &mut outputs).await;
    let recipe_id = outcome.recipe_id.unwrap();

    spawn_precompute(
        h.content.clone(),
        h.store.clone(),
        user_id,
        recipe_id,
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    let recipe = h.store.get_recipe(user_id, recipe_id).await.unwrap();
    assert!(recipe.step_preparations.is_none());
    assert_eq!(recipe.title, "Pasta v1");
}

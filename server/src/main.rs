mod api;
mod auth;
mod config;
mod db;
mod ingest;
mod models;
mod schema;
mod store;
mod telemetry;

use anyhow::Context;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::Router;
use clipchef_core::ai::GeminiContentService;
use clipchef_core::ingest::{IngestConfig, IngestServices};
use clipchef_core::media::{MediaResolver, RetrievalServiceClient};
use clipchef_core::notify::ExpoPushNotifier;
use clipchef_core::queue::{IngestQueue, QueueConfig};
use clipchef_core::storage::HttpObjectStorage;
use clipchef_core::store::RecipeStore;
use std::env;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::Span;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<db::DbPool>,
    pub store: Arc<dyn RecipeStore>,
    pub queue: IngestQueue,
}

fn build_services(store: Arc<dyn RecipeStore>) -> anyhow::Result<IngestServices> {
    let content = Arc::new(GeminiContentService::from_env().context("content service")?);
    let retriever = Arc::new(RetrievalServiceClient::from_env().context("video retriever")?);
    let resolver = Arc::new(MediaResolver::from_env(retriever).context("media resolver")?);
    let storage = Arc::new(HttpObjectStorage::from_env().context("object storage")?);
    let notifier = Arc::new(ExpoPushNotifier::from_env().context("push notifier")?);
    let config = IngestConfig::from_env().context("ingest config")?;

    Ok(IngestServices::new(content, resolver, storage, store, notifier, config))
}

fn app(state: AppState) -> Router {
    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::openapi());

    Router::new()
        .nest("/api/ingest", api::ingest::router())
        .nest("/api/recipes", api::recipes::router())
        .nest("/api/devices", api::devices::router())
        .with_state(state)
        .merge(swagger_ui)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let matched_path = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str)
                        .unwrap_or(request.uri().path());

                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %matched_path,
                    )
                })
                .on_request(|_request: &Request<_>, _span: &Span| {})
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &Span| {
                        let status = response.status().as_u16();
                        if status >= 500 {
                            tracing::error!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request failed with server error"
                            );
                        } else {
                            tracing::info!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request completed"
                            );
                        }
                    },
                )
                .on_failure(
                    |error: tower_http::classify::ServerErrorsFailureClass,
                     latency: std::time::Duration,
                     _span: &Span| {
                        tracing::error!(
                            error = %error,
                            latency_ms = %latency.as_millis(),
                            "request failed"
                        );
                    },
                ),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Check for --openapi flag to dump spec and exit
    if env::args().any(|arg| arg == "--openapi") {
        println!("{}", api::openapi().to_pretty_json()?);
        return Ok(());
    }

    telemetry::init();

    let config = config::ServerConfig::from_env().context("server config")?;
    let pool = Arc::new(db::create_pool(&config.database_url, config.db_pool_size)?);
    let store: Arc<dyn RecipeStore> = Arc::new(store::PgRecipeStore::new(pool.clone()));

    let services = build_services(store.clone())?;
    let queue_config = QueueConfig::from_env().context("queue config")?;
    let worker = Arc::new(ingest::PipelineWorker::new(pool.clone(), services));
    let (queue, dispatcher) = IngestQueue::start(worker, queue_config);

    let state = AppState { pool, store, queue };

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("Server listening on {}", listener.local_addr()?);
    tracing::info!("Swagger UI available at /swagger-ui/");

    axum::serve(listener, app(state)).await?;

    dispatcher.abort();
    Ok(())
}

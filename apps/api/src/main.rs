mod analysis;
mod config;
mod convert;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod routes;
mod state;
mod storage;
mod suggestions;
#[cfg(test)]
mod testing;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::analysis::{AnalysisOrchestrator, RunBoard};
use crate::config::Config;
use crate::convert::PdftoppmConverter;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{ArtifactStore, KvStore, RedisKvStore, S3ArtifactStore};
use crate::suggestions::SuggestionRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resumlyzer API v{}", env!("CARGO_PKG_VERSION"));

    // Key-value records
    let redis = redis::Client::open(config.redis_url.clone())?;
    let kv: Arc<dyn KvStore> = Arc::new(RedisKvStore::new(redis));
    info!("Redis client initialized");

    // Uploaded documents and preview images
    let s3 = build_s3_client(&config).await;
    let artifacts: Arc<dyn ArtifactStore> =
        Arc::new(S3ArtifactStore::new(s3, config.s3_bucket.clone()));
    info!("S3 artifact store initialized (bucket: {})", config.s3_bucket);

    let llm = Arc::new(LlmClient::new(
        config.anthropic_api_key.clone(),
        artifacts.clone(),
    ));
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let converter = Arc::new(PdftoppmConverter::new(
        config.pdftoppm_path.clone(),
        config.preview_dpi,
    ));
    info!(
        "Preview converter: {} at {} dpi",
        config.pdftoppm_path, config.preview_dpi
    );

    let orchestrator = Arc::new(AnalysisOrchestrator::new(
        artifacts.clone(),
        kv.clone(),
        llm.clone(),
        converter,
    ));

    let state = AppState {
        kv,
        artifacts,
        orchestrator,
        runs: RunBoard::default(),
        suggestions: SuggestionRegistry::new(llm),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "resumlyzer-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}

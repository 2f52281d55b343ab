//! Sightings API Service
//!
//! REST API for fungi sighting submissions, listings and photo uploads

use anyhow::{Context, Result};
use sightings_api::config::Config;
use sightings_api::{
    create_router, AppState, Credentials, MemoryStore, RedisStore, S3UploadSigner,
    SightingStore, UploadSigner,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sightings_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Sightings API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Filter dimension: {}", config.filter_dimension);
    info!("Upload bucket: {} ({})", config.upload_bucket, config.upload_region);

    // Initialize storage
    let store: Arc<dyn SightingStore> = if config.memory_store {
        warn!("MEMORY_STORE enabled, sightings will not survive a restart");
        Arc::new(MemoryStore::new())
    } else {
        info!("Redis URL: {}", config.redis_url);
        Arc::new(
            RedisStore::new(&config.redis_url)
                .await
                .context("Failed to initialize storage")?,
        )
    };

    // Initialize upload signer
    let mut signer = S3UploadSigner::new(
        config.upload_bucket.clone(),
        config.upload_region.clone(),
        Credentials {
            access_key_id: config.aws_access_key_id.clone(),
            secret_access_key: config.aws_secret_access_key.clone(),
            session_token: config.aws_session_token.clone(),
        },
    );
    if let Some(endpoint) = &config.upload_endpoint {
        info!("Upload endpoint: {}", endpoint);
        signer = signer
            .with_endpoint(endpoint)
            .context("Invalid UPLOAD_ENDPOINT")?;
    }
    let signer: Arc<dyn UploadSigner> = Arc::new(signer);

    // Create application state and router
    let state = AppState::new(store, signer, config.filter_dimension);
    let app = create_router(state);

    // Bind and serve
    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Sightings API running on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

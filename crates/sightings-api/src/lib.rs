//! Sightings API
//!
//! HTTP backend for submitting and browsing fungi sightings.
//!
//! ## Endpoints
//!
//! - `POST /submit-sighting` - Validate and store a sighting
//! - `GET /sightings` - Page through sightings by user, category/species, or all
//! - `GET /get-upload-url` - Presigned photo upload target (900 s)
//! - `GET /health` - Health check

pub mod config;
pub mod handlers;
pub mod memory;
pub mod presign;
pub mod service;
pub mod storage;

use axum::{
    routing::{get, post},
    Router,
};
use mundo_common::FilterDimension;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use memory::MemoryStore;
pub use presign::{Credentials, S3UploadSigner, UploadSigner};
pub use service::{SightingQueryService, SightingSubmissionService, UploadService};
pub use storage::{RedisStore, SightingStore};

/// Shared application state
///
/// Built once at startup; request handling never mutates it.
pub struct AppState {
    pub store: Arc<dyn SightingStore>,
    pub queries: SightingQueryService,
    pub submissions: SightingSubmissionService,
    pub uploads: UploadService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SightingStore>,
        signer: Arc<dyn UploadSigner>,
        filter_dimension: FilterDimension,
    ) -> Self {
        Self {
            queries: SightingQueryService::new(store.clone(), filter_dimension),
            submissions: SightingSubmissionService::new(store.clone()),
            uploads: UploadService::new(signer),
            store,
        }
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/submit-sighting", post(handlers::submit_sighting_handler))
        .route("/sightings", get(handlers::list_sightings_handler))
        .route("/get-upload-url", get(handlers::upload_url_handler))
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

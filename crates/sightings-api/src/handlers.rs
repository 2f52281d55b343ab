//! API request handlers for the Sightings API

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mundo_common::{ListSightingsParams, Sighting, SightingSubmission, UploadUrlParams};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    service::{SightingPage, UploadUrlResponse},
    AppState,
};

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Offending request field, for 400s
    pub field: Option<&'static str>,
}

impl ApiError {
    fn bad_request(field: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            field: Some(field),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.field {
            Some(field) => serde_json::json!({
                "error": self.message,
                "field": field,
            }),
            None => serde_json::json!({
                "error": self.message
            }),
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<mundo_common::Error> for ApiError {
    fn from(err: mundo_common::Error) -> Self {
        match err.field() {
            Some(field) => ApiError::bad_request(field, err.to_string()),
            None => {
                // Details stay in the logs
                error!("Request failed: {}", err);
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Internal server error".to_string(),
                    field: None,
                }
            }
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request("query", rejection.body_text())
    }
}

/// Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.store.health_check().await {
        Ok(()) => Json(serde_json::json!({
            "status": "healthy",
            "service": "sightings-api"
        }))
        .into_response(),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unhealthy",
                    "service": "sightings-api"
                })),
            )
                .into_response()
        }
    }
}

/// Submit a new sighting
///
/// POST /submit-sighting
pub async fn submit_sighting_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Sighting>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::bad_request("body", "Request body is required"));
    }

    let submission: SightingSubmission = serde_json::from_slice(&body).map_err(|e| {
        ApiError::bad_request("body", format!("Invalid request body: {}", e))
    })?;

    let sighting = state.submissions.submit(submission).await?;
    Ok(Json(sighting))
}

/// List sightings, one page at a time
///
/// GET /sightings?userId=&category=|speciesName=&limit=&lastEvaluatedKey=
pub async fn list_sightings_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListSightingsParams>, QueryRejection>,
) -> Result<Json<SightingPage>, ApiError> {
    let Query(params) = params?;

    let page = state.queries.list(&params).await?;
    info!(
        "Listed {} sightings (more: {})",
        page.count,
        page.last_evaluated_key.is_some()
    );

    Ok(Json(page))
}

/// Issue a presigned photo upload target
///
/// GET /get-upload-url?userId=&filename=
pub async fn upload_url_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<UploadUrlParams>, QueryRejection>,
) -> Result<Json<UploadUrlResponse>, ApiError> {
    let Query(params) = params?;

    let response = state.uploads.issue(&params)?;
    info!("Issued upload URL for key {}", response.key);

    Ok(Json(response))
}

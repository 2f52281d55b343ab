//! Request-level operations behind the HTTP handlers

use chrono::Utc;
use mundo_common::models::generate_id;
use mundo_common::{
    AccessPath, FilterDimension, ListSightingsParams, PageCursor, Result, Sighting,
    SightingQuery, SightingSubmission, UploadUrlParams, UPLOAD_EXPIRES_IN_SECS,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::presign::UploadSigner;
use crate::storage::SightingStore;

/// A page of sightings as returned to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SightingPage {
    pub items: Vec<Sighting>,

    /// Opaque cursor for the next page; absent on the last page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<String>,

    pub count: usize,

    pub scanned_count: usize,
}

/// Paginated, read-only sighting lookups
#[derive(Clone)]
pub struct SightingQueryService {
    store: Arc<dyn SightingStore>,
    dimension: FilterDimension,
}

impl SightingQueryService {
    pub fn new(store: Arc<dyn SightingStore>, dimension: FilterDimension) -> Self {
        Self { store, dimension }
    }

    /// Validate `params`, read one page over the selected access path and
    /// re-encode the continuation marker.
    ///
    /// Index paths come back newest first. Scans have no defined order.
    pub async fn list(&self, params: &ListSightingsParams) -> Result<SightingPage> {
        let query = SightingQuery::from_params(params, self.dimension)?;
        debug!("Listing sightings via {:?} (limit {})", query.path, query.limit);

        let start_after = query.start_after.as_ref();
        let page = match &query.path {
            AccessPath::ByUser(user_id) => {
                self.store
                    .query_by_user(user_id, query.limit, start_after)
                    .await?
            }
            AccessPath::ByFilter(filter) => {
                self.store
                    .query_by_filter(filter, query.limit, start_after)
                    .await?
            }
            AccessPath::Scan => self.store.scan(query.limit, start_after).await?,
        };

        let last_evaluated_key = page
            .last_key
            .as_ref()
            .map(PageCursor::encode)
            .transpose()?
            .map(PageCursor::into_string);

        Ok(SightingPage {
            count: page.items.len(),
            scanned_count: page.scanned_count,
            items: page.items,
            last_evaluated_key,
        })
    }
}

/// Validates and persists new sightings
#[derive(Clone)]
pub struct SightingSubmissionService {
    store: Arc<dyn SightingStore>,
}

impl SightingSubmissionService {
    pub fn new(store: Arc<dyn SightingStore>) -> Self {
        Self { store }
    }

    pub async fn submit(&self, submission: SightingSubmission) -> Result<Sighting> {
        let new = submission.validate()?;

        let timestamp = Utc::now();
        let id = generate_id(&timestamp, &mut rand::thread_rng());
        let sighting = new.into_sighting(id, timestamp);

        self.store.put(&sighting).await?;

        info!(
            "Recorded sighting {} ({}, {})",
            sighting.id, sighting.name, sighting.category
        );
        Ok(sighting)
    }
}

/// Presigned upload target handed to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub upload_url: String,
    pub key: String,
    pub expires_in: u64,
    /// Where the photo will be readable, for the sighting's `imageUrl`
    pub public_url: String,
    /// Content type matching the file extension
    pub content_type: &'static str,
}

#[derive(Clone)]
pub struct UploadService {
    signer: Arc<dyn UploadSigner>,
}

impl UploadService {
    pub fn new(signer: Arc<dyn UploadSigner>) -> Self {
        Self { signer }
    }

    pub fn issue(&self, params: &UploadUrlParams) -> Result<UploadUrlResponse> {
        let target = params.validate()?;

        let now = Utc::now();
        let key = target.object_key(&now);
        let upload_url = self.signer.presign_put(&key, now, UPLOAD_EXPIRES_IN_SECS)?;

        debug!("Issued upload target {} for {}", key, target.user_id);

        Ok(UploadUrlResponse {
            upload_url,
            public_url: self.signer.public_url(&key),
            key,
            expires_in: UPLOAD_EXPIRES_IN_SECS,
            content_type: target.format.content_type(),
        })
    }
}

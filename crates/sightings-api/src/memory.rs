//! In-process sighting store for development and testing
//!
//! Mirrors the Redis store's paging semantics without a server.

use async_trait::async_trait;
use mundo_common::{AccessPath, IndexFilter, PageKey, Result, Sighting};
use std::collections::BTreeMap;
use std::ops::Bound;
use tokio::sync::RwLock;
use tracing::debug;

use crate::storage::{Page, SightingStore};

#[derive(Default)]
pub struct MemoryStore {
    /// Sightings keyed by id; id order is creation order
    sightings: RwLock<BTreeMap<String, Sighting>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sightings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sightings.read().await.is_empty()
    }

    async fn read_page<F>(
        &self,
        path: AccessPath,
        limit: u32,
        start_after: Option<&PageKey>,
        matches: F,
    ) -> Result<Page>
    where
        F: Fn(&Sighting) -> bool,
    {
        let sightings = self.sightings.read().await;
        let limit = limit as usize;

        let range = match start_after {
            Some(key) if path.is_ordered() => {
                sightings.range::<str, _>((Bound::Unbounded, Bound::Excluded(key.id.as_str())))
            }
            Some(key) => {
                sightings.range::<str, _>((Bound::Excluded(key.id.as_str()), Bound::Unbounded))
            }
            None => sightings.range::<str, _>(..),
        };

        let selected: Vec<&Sighting> = if path.is_ordered() {
            range
                .rev()
                .map(|(_, s)| s)
                .filter(|s| matches(s))
                .take(limit + 1)
                .collect()
        } else {
            range
                .map(|(_, s)| s)
                .filter(|s| matches(s))
                .take(limit + 1)
                .collect()
        };

        let has_more = selected.len() > limit;
        let items: Vec<Sighting> = selected.into_iter().take(limit).cloned().collect();
        let last_key = if has_more {
            items.last().map(|s| PageKey::new(&path, s.id.clone()))
        } else {
            None
        };

        Ok(Page {
            scanned_count: items.len(),
            items,
            last_key,
        })
    }
}

#[async_trait]
impl SightingStore for MemoryStore {
    async fn query_by_user(
        &self,
        user_id: &str,
        limit: u32,
        start_after: Option<&PageKey>,
    ) -> Result<Page> {
        let path = AccessPath::ByUser(user_id.to_string());
        self.read_page(path, limit, start_after, |s| {
            s.user_id.as_deref() == Some(user_id)
        })
        .await
    }

    async fn query_by_filter(
        &self,
        filter: &IndexFilter,
        limit: u32,
        start_after: Option<&PageKey>,
    ) -> Result<Page> {
        let path = AccessPath::ByFilter(filter.clone());
        match filter {
            IndexFilter::Category(category) => {
                self.read_page(path, limit, start_after, |s| s.category == *category)
                    .await
            }
            IndexFilter::SpeciesName(name) => {
                let name = name.to_lowercase();
                self.read_page(path, limit, start_after, |s| s.name.to_lowercase() == name)
                    .await
            }
        }
    }

    async fn scan(&self, limit: u32, start_after: Option<&PageKey>) -> Result<Page> {
        self.read_page(AccessPath::Scan, limit, start_after, |_| true)
            .await
    }

    async fn put(&self, sighting: &Sighting) -> Result<()> {
        let mut sightings = self.sightings.write().await;
        sightings.insert(sighting.id.clone(), sighting.clone());
        debug!("Stored sighting {} in memory", sighting.id);
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

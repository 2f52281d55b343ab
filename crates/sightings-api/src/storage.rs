//! Sighting storage
//!
//! Redis data model:
//! - sighting:{id} → JSON-encoded sighting
//! - sightings:all → Sorted set of every id (score 0, lexicographic order)
//! - sightings:user:{user_id} → Sorted set of the user's ids
//! - sightings:category:{category} → Sorted set of ids per category
//! - sightings:species:{name} → Sorted set of ids per lowercased species name
//!
//! Ids start with a fixed-width creation timestamp, so lexicographic order
//! on the sorted sets is creation order.

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use mundo_common::{AccessPath, Category, Error, IndexFilter, PageKey, Result, Sighting};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

/// One page of a read, plus where to resume
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Sighting>,

    /// Present iff more results exist after this page
    pub last_key: Option<PageKey>,

    /// Index entries examined to build the page
    pub scanned_count: usize,
}

/// Backend holding sightings
///
/// Index reads return newest first; `scan` makes no ordering promise.
#[async_trait]
pub trait SightingStore: Send + Sync {
    async fn query_by_user(
        &self,
        user_id: &str,
        limit: u32,
        start_after: Option<&PageKey>,
    ) -> Result<Page>;

    async fn query_by_filter(
        &self,
        filter: &IndexFilter,
        limit: u32,
        start_after: Option<&PageKey>,
    ) -> Result<Page>;

    async fn scan(&self, limit: u32, start_after: Option<&PageKey>) -> Result<Page>;

    /// Unconditional insert
    async fn put(&self, sighting: &Sighting) -> Result<()>;

    async fn health_check(&self) -> Result<()>;
}

const ALL_KEY: &str = "sightings:all";

fn sighting_key(id: &str) -> String {
    format!("sighting:{}", id)
}

fn user_index_key(user_id: &str) -> String {
    format!("sightings:user:{}", user_id)
}

fn category_index_key(category: Category) -> String {
    format!("sightings:category:{}", category)
}

fn species_index_key(name: &str) -> String {
    format!("sightings:species:{}", name.to_lowercase())
}

fn storage_error(err: redis::RedisError) -> Error {
    Error::Storage(err.to_string())
}

/// Redis-backed sighting store
///
/// The connection manager is cloned per call; it multiplexes over a single
/// connection and reconnects on its own.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Create a new storage instance
    pub async fn new(redis_url: &str) -> AnyResult<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        info!("Connected to Redis at {}", redis_url);

        Ok(Self { conn })
    }

    async fn read_page(
        &self,
        index_key: &str,
        path: AccessPath,
        limit: u32,
        start_after: Option<&PageKey>,
    ) -> Result<Page> {
        let mut conn = self.conn.clone();
        let limit = limit as usize;
        // One extra entry tells us whether another page exists
        let fetch = (limit + 1) as isize;

        let ids: redis::RedisResult<Vec<String>> = if path.is_ordered() {
            let max = start_after
                .map(|key| format!("({}", key.id))
                .unwrap_or_else(|| "+".to_string());
            conn.zrevrangebylex_limit(index_key, max, "-", 0, fetch).await
        } else {
            let min = start_after
                .map(|key| format!("({}", key.id))
                .unwrap_or_else(|| "-".to_string());
            conn.zrangebylex_limit(index_key, min, "+", 0, fetch).await
        };
        let mut ids = ids.map_err(storage_error)?;

        let has_more = ids.len() > limit;
        ids.truncate(limit);

        let items = if ids.is_empty() {
            Vec::new()
        } else {
            let keys: Vec<String> = ids.iter().map(|id| sighting_key(id)).collect();
            let raw: Vec<Option<String>> = redis::cmd("MGET")
                .arg(&keys)
                .query_async(&mut conn)
                .await
                .map_err(storage_error)?;

            raw.into_iter()
                .flatten()
                .map(|json| serde_json::from_str::<Sighting>(&json))
                .collect::<std::result::Result<Vec<_>, _>>()?
        };

        if items.len() < ids.len() {
            debug!(
                "{} index entries in {} have no record",
                ids.len() - items.len(),
                index_key
            );
        }

        let last_key = if has_more {
            ids.last().map(|id| PageKey::new(&path, id.clone()))
        } else {
            None
        };

        Ok(Page {
            items,
            last_key,
            scanned_count: ids.len(),
        })
    }
}

#[async_trait]
impl SightingStore for RedisStore {
    async fn query_by_user(
        &self,
        user_id: &str,
        limit: u32,
        start_after: Option<&PageKey>,
    ) -> Result<Page> {
        let path = AccessPath::ByUser(user_id.to_string());
        self.read_page(&user_index_key(user_id), path, limit, start_after)
            .await
    }

    async fn query_by_filter(
        &self,
        filter: &IndexFilter,
        limit: u32,
        start_after: Option<&PageKey>,
    ) -> Result<Page> {
        let index_key = match filter {
            IndexFilter::Category(category) => category_index_key(*category),
            IndexFilter::SpeciesName(name) => species_index_key(name),
        };
        let path = AccessPath::ByFilter(filter.clone());
        self.read_page(&index_key, path, limit, start_after).await
    }

    async fn scan(&self, limit: u32, start_after: Option<&PageKey>) -> Result<Page> {
        self.read_page(ALL_KEY, AccessPath::Scan, limit, start_after)
            .await
    }

    async fn put(&self, sighting: &Sighting) -> Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(sighting)?;
        let id = sighting.id.as_str();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .set(sighting_key(id), json)
            .ignore()
            .zadd(ALL_KEY, id, 0)
            .ignore()
            .zadd(category_index_key(sighting.category), id, 0)
            .ignore()
            .zadd(species_index_key(&sighting.name), id, 0)
            .ignore();

        if let Some(user_id) = &sighting.user_id {
            pipe.zadd(user_index_key(user_id), id, 0).ignore();
        }

        pipe.query_async::<_, ()>(&mut conn)
            .await
            .map_err(storage_error)?;

        debug!("Stored sighting {}", id);
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}

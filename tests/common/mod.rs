#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use og_preview::cache::{Cache, MemoryCache};
use og_preview::db::{self, RecordStore, SqliteStore};
use og_preview::error::{CacheError, StoreError};
use og_preview::fetcher::MetadataFetcher;
use og_preview::model::{UrlRecord, UrlStatus};
use og_preview::Resolver;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::Mutex;

pub const TTL: Duration = Duration::from_secs(300);

pub async fn setup_pool() -> sqlx::SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool
}

/// Shared, ordered log of side effects across fakes.
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// Fetcher with canned answers per URL; unknown URLs yield no image.
#[derive(Clone, Default)]
pub struct RecordingFetcher {
    images: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingFetcher {
    pub async fn with_image(self, url: &str, image_url: &str) -> Self {
        self.images
            .lock()
            .await
            .insert(url.to_string(), image_url.to_string());
        self
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl MetadataFetcher for RecordingFetcher {
    async fn extract_image(&self, url: &str) -> Option<String> {
        self.calls.lock().await.push(url.to_string());
        // yield so concurrent submissions can interleave around the fetch
        tokio::task::yield_now().await;
        self.images.lock().await.get(url).cloned()
    }
}

/// In-memory cache that records every `set`.
#[derive(Clone)]
pub struct RecordingCache {
    inner: MemoryCache,
    events: EventLog,
}

impl RecordingCache {
    pub fn new(events: EventLog) -> Self {
        Self {
            inner: MemoryCache::default(),
            events,
        }
    }
}

#[async_trait]
impl Cache for RecordingCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.events
            .lock()
            .await
            .push(format!("cache.set {key} {value}"));
        self.inner.set(key, value, ttl).await
    }
}

/// Store wrapper that logs updates and can hide existing rows from the
/// first `stale_reads` URL lookups, as a concurrent submitter would see.
#[derive(Clone)]
pub struct ObservedStore {
    inner: SqliteStore,
    events: EventLog,
    stale_reads: Arc<Mutex<usize>>,
    creates: Arc<Mutex<Vec<Result<i64, String>>>>,
}

impl ObservedStore {
    pub fn new(inner: SqliteStore, events: EventLog) -> Self {
        Self {
            inner,
            events,
            stale_reads: Arc::new(Mutex::new(0)),
            creates: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn hide_next_reads(&self, n: usize) {
        *self.stale_reads.lock().await = n;
    }

    pub async fn creates(&self) -> Vec<Result<i64, String>> {
        self.creates.lock().await.clone()
    }
}

#[async_trait]
impl RecordStore for ObservedStore {
    async fn create(&self, url: &str) -> Result<UrlRecord, StoreError> {
        let res = self.inner.create(url).await;
        self.creates.lock().await.push(match &res {
            Ok(r) => Ok(r.id),
            Err(e) => Err(e.to_string()),
        });
        res
    }

    async fn get_by_url(&self, url: &str) -> Result<Option<UrlRecord>, StoreError> {
        {
            let mut stale = self.stale_reads.lock().await;
            if *stale > 0 {
                *stale -= 1;
                return Ok(None);
            }
        }
        self.inner.get_by_url(url).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<UrlRecord>, StoreError> {
        self.inner.get_by_id(id).await
    }

    async fn update(
        &self,
        id: i64,
        image_url: Option<&str>,
        status: UrlStatus,
    ) -> Result<(), StoreError> {
        self.events
            .lock()
            .await
            .push(format!("store.update {id} {}", status.as_str()));
        self.inner.update(id, image_url, status).await
    }

    async fn list_page(
        &self,
        limit: u32,
        cursor: Option<i64>,
        descending: bool,
    ) -> Result<(Vec<UrlRecord>, Option<i64>), StoreError> {
        self.inner.list_page(limit, cursor, descending).await
    }
}

pub struct Harness {
    pub pool: sqlx::SqlitePool,
    pub store: ObservedStore,
    pub cache: RecordingCache,
    pub fetcher: RecordingFetcher,
    pub events: EventLog,
    pub resolver: Resolver,
}

pub async fn harness(fetcher: RecordingFetcher) -> Harness {
    let pool = setup_pool().await;
    let events: EventLog = Arc::default();
    let store = ObservedStore::new(SqliteStore::new(pool.clone()), events.clone());
    let cache = RecordingCache::new(events.clone());
    let resolver = Resolver::new(
        Arc::new(store.clone()),
        Arc::new(cache.clone()),
        Arc::new(fetcher.clone()),
        TTL,
    );
    Harness {
        pool,
        store,
        cache,
        fetcher,
        events,
        resolver,
    }
}

/// Cache whose backend is unreachable. With `reads_ok` lookups miss
/// instead of failing, so only writes report the outage.
#[derive(Clone)]
pub struct FailingCache {
    reads_ok: bool,
}

impl FailingCache {
    pub fn down() -> Self {
        Self { reads_ok: false }
    }

    pub fn rejecting_writes() -> Self {
        Self { reads_ok: true }
    }
}

fn redis_down() -> CacheError {
    CacheError::Redis(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "connection refused",
    )))
}

#[async_trait]
impl Cache for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        if self.reads_ok {
            Ok(None)
        } else {
            Err(redis_down())
        }
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(redis_down())
    }
}

/// Store whose every call fails as if the pool were exhausted.
#[derive(Clone, Default)]
pub struct FailingStore;

#[async_trait]
impl RecordStore for FailingStore {
    async fn create(&self, _url: &str) -> Result<UrlRecord, StoreError> {
        Err(sqlx::Error::PoolTimedOut.into())
    }

    async fn get_by_url(&self, _url: &str) -> Result<Option<UrlRecord>, StoreError> {
        Err(sqlx::Error::PoolTimedOut.into())
    }

    async fn get_by_id(&self, _id: i64) -> Result<Option<UrlRecord>, StoreError> {
        Err(sqlx::Error::PoolTimedOut.into())
    }

    async fn update(
        &self,
        _id: i64,
        _image_url: Option<&str>,
        _status: UrlStatus,
    ) -> Result<(), StoreError> {
        Err(sqlx::Error::PoolTimedOut.into())
    }

    async fn list_page(
        &self,
        _limit: u32,
        _cursor: Option<i64>,
        _descending: bool,
    ) -> Result<(Vec<UrlRecord>, Option<i64>), StoreError> {
        Err(sqlx::Error::PoolTimedOut.into())
    }
}

//! Ephemeral key/value cache with per-entry TTL.
//!
//! Two backends: Redis for deployments that share a cache between
//! processes, and an in-process moka cache. Entries are never deleted
//! explicitly; they only expire.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use moka::Expiry;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::config::{CacheBackend, CacheConfig};
use crate::error::CacheError;

/// Default TTL for resolved image URLs.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default capacity of the in-process backend.
pub const DEFAULT_CAPACITY: u64 = 10_000;

#[async_trait]
pub trait Cache: Send + Sync {
    /// `None` on miss or expiry.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Overwrite the entry and restart its TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

/// Shared cache backed by a Redis server.
#[derive(Clone)]
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        tracing::info!(redis_url = %redis_url, "connected to redis cache");
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        // EX takes whole seconds and rejects zero
        let secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, secs).await?;
        Ok(())
    }
}

/// Build the backend selected in configuration.
pub async fn from_config(cfg: &CacheConfig) -> Result<Arc<dyn Cache>, CacheError> {
    match (cfg.backend, cfg.redis_url.as_deref()) {
        (CacheBackend::Redis, Some(redis_url)) => {
            Ok(Arc::new(RedisCache::connect(redis_url).await?))
        }
        (CacheBackend::Redis, None) => Err(CacheError::Config("cache.redis_url is not set")),
        (CacheBackend::Memory, _) => {
            tracing::info!(max_capacity = cfg.max_capacity, "using in-process cache");
            Ok(Arc::new(MemoryCache::new(cfg.max_capacity)))
        }
    }
}

#[derive(Clone, Debug)]
struct Entry {
    value: String,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct EntryTtl;

impl Expiry<String, Entry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Process-local cache with per-entry TTL; capacity is bounded by moka's
/// eviction.
#[derive(Clone)]
pub struct MemoryCache {
    inner: MokaCache<String, Entry>,
}

impl MemoryCache {
    pub fn new(max_capacity: u64) -> Self {
        let inner = MokaCache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryTtl)
            .build();
        Self { inner }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.inner.get(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let entry = Entry {
            value: value.to_string(),
            ttl,
        };
        self.inner.insert(key.to_string(), entry).await;
        Ok(())
    }
}

//! Submit-and-resolve workflow over the cache, record store and fetcher.
//!
//! Lookup order is cache, then store, then one network fetch. Whenever both
//! are written, the store is written before the cache, so a cached image
//! always has a matching store row.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::cache::Cache;
use crate::db::RecordStore;
use crate::error::{ResolveError, StoreError};
use crate::fetcher::MetadataFetcher;
use crate::model::{Page, UrlRecord, UrlStatus};

pub const DEFAULT_HISTORY_LIMIT: u32 = 10;

#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn RecordStore>,
    cache: Arc<dyn Cache>,
    fetcher: Arc<dyn MetadataFetcher>,
    ttl: Duration,
}

impl Resolver {
    pub fn new(
        store: Arc<dyn RecordStore>,
        cache: Arc<dyn Cache>,
        fetcher: Arc<dyn MetadataFetcher>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            fetcher,
            ttl,
        }
    }

    /// Resolve `url` to a record, fetching the page only when neither the
    /// cache nor the store already holds an image for it.
    #[instrument(skip(self))]
    pub async fn submit(&self, url: &str) -> Result<UrlRecord, ResolveError> {
        if let Some(cached) = self.cache.get(url).await? {
            if let Some(record) = self.store.get_by_url(url).await? {
                info!(url = %url, image_url = %cached, "cache hit");
                return Ok(record);
            }
            warn!(url = %url, "cache hit without a stored record; falling back to store");
        }

        let record = match self.store.get_by_url(url).await? {
            Some(record) => record,
            None => match self.store.create(url).await {
                Ok(record) => {
                    info!(url = %url, id = record.id, "created record");
                    record
                }
                Err(StoreError::Conflict(_)) => {
                    warn!(url = %url, "lost creation race; re-reading");
                    self.store
                        .get_by_url(url)
                        .await?
                        .ok_or_else(|| StoreError::Conflict(url.to_string()))?
                }
                Err(err) => return Err(err.into()),
            },
        };

        if let Some(image_url) = record.image_url.as_deref() {
            self.cache.set(url, image_url, self.ttl).await?;
            info!(url = %url, image_url = %image_url, "store hit; cache refreshed");
            return Ok(record);
        }

        self.resolve_by_id(record.id).await?;

        self.store
            .get_by_id(record.id)
            .await?
            .ok_or(ResolveError::Vanished(record.id))
    }

    /// Fetch the page behind record `id` and persist the outcome. A missing
    /// image marks the record `failed` and leaves the cache untouched.
    async fn resolve_by_id(&self, id: i64) -> Result<(), ResolveError> {
        let Some(record) = self.store.get_by_id(id).await? else {
            return Ok(());
        };

        match self.fetcher.extract_image(&record.url).await {
            Some(image_url) => {
                self.store
                    .update(id, Some(&image_url), UrlStatus::Success)
                    .await?;
                self.cache.set(&record.url, &image_url, self.ttl).await?;
                info!(url = %record.url, image_url = %image_url, "resolved");
            }
            None => {
                self.store.update(id, None, UrlStatus::Failed).await?;
                info!(url = %record.url, "no og:image found");
            }
        }
        Ok(())
    }

    /// Newest-first history page starting at `cursor` (inclusive).
    pub async fn history(
        &self,
        limit: u32,
        cursor: Option<i64>,
    ) -> Result<Page<UrlRecord>, ResolveError> {
        let (results, next_cursor) = self.store.list_page(limit, cursor, true).await?;
        Ok(Page {
            results,
            next_cursor,
        })
    }
}

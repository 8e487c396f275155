use async_trait::async_trait;
use portkey_core::repository::Result;
use portkey_core::{
    CacheError, NewShortUrl, OwnerId, ReadRepository, ShortCode, ShortUrl, StorageError,
    UrlCache, UrlId, UrlRepository,
};
use std::sync::Arc;
use tracing::{trace, warn};

/// A repository decorator that adds caching to code lookups.
///
/// This implementation composes any [`ReadRepository`] with any [`UrlCache`]
/// implementation. `lookup` checks the cache first, falling back to the
/// inner repository, and caches what it finds. Deleted records are cached
/// as well, so `Gone` is served from the cache too.
///
/// When the inner repository is also a [`UrlRepository`], writes through
/// the decorator invalidate the affected code.
#[derive(Debug)]
pub struct CachedRepository<R, C> {
    inner: Arc<R>,
    cache: C,
}

impl<R: ReadRepository, C: UrlCache> CachedRepository<R, C> {
    /// Creates a new cached repository decorator.
    pub fn new(inner: Arc<R>, cache: C) -> Self {
        Self { inner, cache }
    }

    /// Returns a reference to the inner repository.
    pub fn inner(&self) -> &Arc<R> {
        &self.inner
    }

    /// Returns a reference to the cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Invalidate a cached entry.
    pub async fn invalidate(&self, code: &ShortCode) -> Result<()> {
        trace!(code = %code, "invalidating cache entry");
        self.cache.del(code).await.map_err(StorageError::from)
    }

    /// Invalidation failures are logged, not returned: the write already
    /// succeeded and the entry ages out with the cache TTL.
    async fn invalidate_quietly(&self, code: &ShortCode) {
        if let Err(e) = self.invalidate(code).await {
            warn!(code = %code, error = %e, "failed to invalidate cache entry");
        }
    }
}

fn storage_to_cache_error(err: StorageError) -> CacheError {
    match err {
        StorageError::Cache(inner) => inner,
        StorageError::Unavailable(message) => CacheError::Unavailable(message),
        StorageError::Timeout(message) => CacheError::Timeout(message),
        StorageError::InvalidData(message) => CacheError::InvalidData(message),
        other => CacheError::Operation(other.to_string()),
    }
}

#[async_trait]
impl<R: ReadRepository, C: UrlCache> ReadRepository for CachedRepository<R, C> {
    async fn lookup(&self, code: &ShortCode) -> Result<Option<ShortUrl>> {
        trace!(code = %code, "looking up short code with cache");

        // Single-flight where the cache supports it.
        self.cache
            .get_or_compute(code, move |c| {
                let code = c.clone();
                async move {
                    trace!(code = %code, "cache miss, fetching from inner repository");
                    self.inner
                        .lookup(&code)
                        .await
                        .map_err(storage_to_cache_error)
                }
            })
            .await
            .map_err(StorageError::from)
    }

    async fn get(&self, id: UrlId) -> Result<Option<ShortUrl>> {
        self.inner.get(id).await
    }
}

#[async_trait]
impl<R: UrlRepository, C: UrlCache> UrlRepository for CachedRepository<R, C> {
    async fn insert(&self, record: NewShortUrl) -> Result<ShortUrl> {
        let stored = self.inner.insert(record).await?;
        // Drops a cached miss for a code that now exists.
        self.invalidate_quietly(&stored.code).await;
        Ok(stored)
    }

    async fn list_by_owner(&self, owner: OwnerId) -> Result<Vec<ShortUrl>> {
        self.inner.list_by_owner(owner).await
    }

    async fn soft_delete(&self, id: UrlId) -> Result<Option<ShortUrl>> {
        let deleted = self.inner.soft_delete(id).await?;
        if let Some(record) = &deleted {
            self.invalidate_quietly(&record.code).await;
        }
        Ok(deleted)
    }
}

use async_trait::async_trait;
use moka::future::Cache;
use portkey_core::{CacheError, ShortCode, ShortUrl, UrlCache};
use std::future::Future;
use std::time::Duration;
use tracing::trace;
use typed_builder::TypedBuilder;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Bounds of a [`MokaUrlCache`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct CacheConfig {
    #[builder(default = 10_000)]
    pub max_capacity: u64,
    /// Upper bound on how stale an entry can get when another node writes.
    #[builder(default, setter(strip_option))]
    pub ttl: Option<Duration>,
    #[builder(default, setter(strip_option))]
    pub tti: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Per-process cache of code lookups.
///
/// Every lookup outcome is stored: active records, soft-deleted records
/// and unknown codes (`None`). Concurrent misses on one code share a
/// single store read.
#[derive(Debug, Clone)]
pub struct MokaUrlCache {
    entries: Cache<ShortCode, Option<ShortUrl>>,
}

impl MokaUrlCache {
    pub fn new() -> Self {
        CacheConfig::default().into()
    }
}

impl Default for MokaUrlCache {
    fn default() -> Self {
        Self::new()
    }
}

impl From<CacheConfig> for MokaUrlCache {
    fn from(config: CacheConfig) -> Self {
        let mut builder = Cache::builder().max_capacity(config.max_capacity);
        if let Some(ttl) = config.ttl {
            builder = builder.time_to_live(ttl);
        }
        if let Some(tti) = config.tti {
            builder = builder.time_to_idle(tti);
        }
        Self {
            entries: builder.build(),
        }
    }
}

#[async_trait]
impl UrlCache for MokaUrlCache {
    /// A cached "unknown code" reads the same as an absent entry.
    async fn get_url(&self, code: &ShortCode) -> Result<Option<ShortUrl>> {
        let hit = self.entries.get(code).await.flatten();
        trace!(code = %code, hit = hit.is_some(), "moka lookup");
        Ok(hit)
    }

    async fn set_url(&self, code: &ShortCode, record: &ShortUrl) -> Result<()> {
        self.entries.insert(code.clone(), Some(record.clone())).await;
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        self.entries.invalidate(code).await;
        trace!(code = %code, "moka entry invalidated");
        Ok(())
    }

    async fn get_or_compute<F, Fut>(&self, code: &ShortCode, fetch: F) -> Result<Option<ShortUrl>>
    where
        F: FnOnce(&ShortCode) -> Fut + Send,
        Fut: Future<Output = Result<Option<ShortUrl>>> + Send,
    {
        // Errors are not cached; the next caller fetches again.
        self.entries
            .try_get_with(code.clone(), fetch(code))
            .await
            .map_err(|e| e.as_ref().clone())
    }
}

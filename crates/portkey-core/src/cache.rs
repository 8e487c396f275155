use crate::error::CacheError;
use crate::shortcode::ShortCode;
use crate::url::ShortUrl;
use async_trait::async_trait;
use std::future::Future;

pub type Result<T> = std::result::Result<T, CacheError>;

/// A cache of code lookups.
///
/// Keys are [`ShortCode`]s and values are the outcome of
/// [`ReadRepository::lookup`](crate::ReadRepository::lookup), including
/// soft-deleted records so that `Gone` can be served from the cache too.
#[async_trait]
pub trait UrlCache: Send + Sync + 'static {
    /// Get a cached record.
    ///
    /// Returns `Ok(None)` if the key is not in the cache.
    async fn get_url(&self, code: &ShortCode) -> Result<Option<ShortUrl>>;

    /// Store a record in the cache.
    async fn set_url(&self, code: &ShortCode, record: &ShortUrl) -> Result<()>;

    /// Remove a cached record. Removing a missing key is not an error.
    async fn del(&self, code: &ShortCode) -> Result<()>;

    /// Get a cached record, computing it with `fetch` if not present.
    async fn get_or_compute<F, Fut>(&self, code: &ShortCode, fetch: F) -> Result<Option<ShortUrl>>
    where
        F: FnOnce(&ShortCode) -> Fut + Send,
        Fut: Future<Output = Result<Option<ShortUrl>>> + Send,
    {
        match self.get_url(code).await? {
            Some(record) => Ok(Some(record)),
            None => {
                let record = fetch(code).await?;
                if let Some(ref value) = record {
                    self.set_url(code, value).await?;
                }
                Ok(record)
            }
        }
    }
}

use crate::error::Result;
use async_trait::async_trait;
use portkey_core::{Identity, ShortCode, ShortUrl, UrlId};

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Validates `original_url` and stores it under a freshly generated code
    /// owned by the requester.
    async fn create(&self, requester: Option<&Identity>, original_url: &str) -> Result<ShortUrl>;

    /// Returns the active record for `code`. Deleted records are `NotFound`.
    async fn get_by_code(&self, code: &ShortCode) -> Result<ShortUrl>;

    /// The requester's active records, newest first.
    async fn list_by_owner(&self, requester: Option<&Identity>) -> Result<Vec<ShortUrl>>;

    /// Soft-deletes a record owned by the requester and returns it.
    async fn soft_delete(&self, id: UrlId, requester: Option<&Identity>) -> Result<ShortUrl>;
}

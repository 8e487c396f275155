use crate::click::{ClickEvent, NewClick, Page};
use crate::error::StorageError;
use crate::id::{OwnerId, UrlId};
use crate::shortcode::ShortCode;
use crate::url::{NewShortUrl, ShortUrl};
use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use std::collections::HashMap;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Whether the code of a soft-deleted record may be issued again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CodeReuse {
    /// A code is bound to its first record forever.
    #[default]
    Never,
    /// A code becomes free once its record has been deleted for this long.
    AfterEmbargo(SignedDuration),
}

impl CodeReuse {
    /// Returns `true` if a record deleted at `deleted_at` still blocks its code at `now`.
    ///
    /// An embargo reaching past the representable range never elapses.
    pub fn blocks(&self, deleted_at: Timestamp, now: Timestamp) -> bool {
        match self {
            CodeReuse::Never => true,
            CodeReuse::AfterEmbargo(embargo) => deleted_at
                .checked_add(*embargo)
                .map_or(true, |until| until > now),
        }
    }
}

/// A read-only view of the URL store.
///
/// This is all the redirector needs, so it can be handed a narrower
/// capability than [`UrlRepository`].
#[async_trait]
pub trait ReadRepository: Send + Sync + 'static {
    /// Returns the record currently bound to `code`.
    ///
    /// The active record wins; when there is none, the most recently
    /// deleted record carrying the code is returned so callers can tell
    /// "was here" apart from "never existed".
    async fn lookup(&self, code: &ShortCode) -> Result<Option<ShortUrl>>;

    /// Returns the record with the given primary key, deleted or not.
    async fn get(&self, id: UrlId) -> Result<Option<ShortUrl>>;
}

#[async_trait]
pub trait UrlRepository: ReadRepository {
    /// Inserts a new record and assigns its primary key.
    ///
    /// Returns `Err(Conflict)` if the code is held by an active record, or by
    /// a deleted record still covered by the repository's [`CodeReuse`] policy.
    /// The check and the insert are a single atomic step.
    async fn insert(&self, record: NewShortUrl) -> Result<ShortUrl>;

    /// Active records of `owner`, newest first.
    async fn list_by_owner(&self, owner: OwnerId) -> Result<Vec<ShortUrl>>;

    /// Marks the record as deleted.
    ///
    /// Returns the updated record, or `None` if it does not exist or was
    /// already deleted.
    async fn soft_delete(&self, id: UrlId) -> Result<Option<ShortUrl>>;
}

/// Append-only click log.
#[async_trait]
pub trait ClickRepository: Send + Sync + 'static {
    /// Appends one event and assigns its primary key.
    async fn append(&self, click: NewClick) -> Result<ClickEvent>;

    /// Exact number of events recorded for `url`.
    async fn count(&self, url: UrlId) -> Result<u64>;

    /// Exact event counts for several URLs. URLs without events map to zero.
    async fn count_many(&self, urls: &[UrlId]) -> Result<HashMap<UrlId, u64>>;

    /// Events of `url`, newest first, restricted to `page`.
    async fn list(&self, url: UrlId, page: Page) -> Result<Vec<ClickEvent>>;
}

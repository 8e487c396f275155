use crate::id::{OwnerId, UrlId};
use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A stored short URL record.
///
/// `code`, `original_url`, `owner_id` and `created_at` never change after
/// creation. A non-null `deleted_at` marks the record as soft-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortUrl {
    pub id: UrlId,
    pub code: ShortCode,
    pub original_url: String,
    pub owner_id: OwnerId,
    pub created_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl ShortUrl {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Fields supplied by the caller when inserting a new record.
///
/// The primary key is assigned by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShortUrl {
    pub code: ShortCode,
    pub original_url: String,
    pub owner_id: OwnerId,
    pub created_at: Timestamp,
}

impl NewShortUrl {
    pub fn into_short_url(self, id: UrlId) -> ShortUrl {
        ShortUrl {
            id,
            code: self.code,
            original_url: self.original_url,
            owner_id: self.owner_id,
            created_at: self.created_at,
            deleted_at: None,
        }
    }
}

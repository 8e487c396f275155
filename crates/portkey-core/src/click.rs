use crate::id::{ClickId, UrlId};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// One recorded visit of a short URL. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub id: ClickId,
    pub short_url_id: UrlId,
    pub clicked_at: Timestamp,
    pub ip_address: Option<IpAddr>,
    pub user_agent: Option<String>,
}

/// A visit captured on the redirect path, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClick {
    pub short_url_id: UrlId,
    pub clicked_at: Timestamp,
    pub ip_address: Option<IpAddr>,
    pub user_agent: Option<String>,
}

impl NewClick {
    pub fn into_event(self, id: ClickId) -> ClickEvent {
        ClickEvent {
            id,
            short_url_id: self.short_url_id,
            clicked_at: self.clicked_at,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
        }
    }
}

/// Offset/limit window over a newest-first click list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    /// `None` returns everything after `offset`.
    pub limit: Option<u64>,
}

impl Page {
    /// The whole list.
    pub const ALL: Page = Page {
        offset: 0,
        limit: None,
    };

    pub fn is_all(&self) -> bool {
        self.offset == 0 && self.limit.is_none()
    }
}

/// Fire-and-forget destination for visits captured on the redirect path.
///
/// `record` must return without waiting for the click to be stored.
/// Implementations own durability (queueing, retries) and must never
/// surface a failure to the caller.
pub trait ClickSink: Send + Sync + 'static {
    fn record(&self, click: NewClick);
}

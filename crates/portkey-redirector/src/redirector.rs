use crate::Result;
use async_trait::async_trait;
use portkey_core::{ShortCode, ShortUrl};
use std::net::IpAddr;

/// Request metadata captured for click analytics. Best effort only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Visit {
    pub ip_address: Option<IpAddr>,
    pub user_agent: Option<String>,
}

/// Outcome of resolving a short code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The code is active; redirect to `original_url`.
    Redirect(ShortUrl),
    /// The code existed but its record was soft-deleted.
    Gone,
    /// The code was never issued.
    NotFound,
}

#[async_trait]
pub trait Redirector: Send + Sync + 'static {
    /// Resolves a short code and records the visit when it redirects.
    async fn resolve(&self, code: &ShortCode, visit: Visit) -> Result<Resolution>;

    /// Resolves a short code without recording a visit.
    async fn peek(&self, code: &ShortCode) -> Result<Resolution>;
}

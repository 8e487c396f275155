//! Ownership gate shared by every owner-scoped operation.
//!
//! The caller's identity is always passed in explicitly, as
//! `Option<&Identity>`, after the external auth collaborator has verified
//! the session. `None` means an anonymous request.

use crate::id::OwnerId;
use crate::url::ShortUrl;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An authenticated account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub owner_id: OwnerId,
}

impl Identity {
    pub fn new(owner_id: impl Into<OwnerId>) -> Self {
        Self {
            owner_id: owner_id.into(),
        }
    }

    pub fn owns(&self, url: &ShortUrl) -> bool {
        url.owner_id == self.owner_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("not the owner of this url")]
    Forbidden,
}

/// Rejects anonymous requests.
pub fn require_identity(requester: Option<&Identity>) -> Result<&Identity, AccessError> {
    requester.ok_or(AccessError::Unauthenticated)
}

/// Rejects requests from anyone but the owner of `url`.
pub fn authorize_owner<'a>(
    requester: Option<&'a Identity>,
    url: &ShortUrl,
) -> Result<&'a Identity, AccessError> {
    let identity = require_identity(requester)?;
    if identity.owns(url) {
        Ok(identity)
    } else {
        Err(AccessError::Forbidden)
    }
}

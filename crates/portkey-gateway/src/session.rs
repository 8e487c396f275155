use std::collections::HashMap;

use async_trait::async_trait;
use portkey_core::{Identity, OwnerId};
use thiserror::Error;

/// Cookie carrying the session token issued by the accounts service.
pub const SESSION_COOKIE: &str = "sessionid";

/// Resolves session tokens to identities.
///
/// Login, logout and registration live in the accounts service; the
/// gateway only asks who a token belongs to.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn identify(&self, token: &str) -> Option<Identity>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session entry must look like `token=owner_id`: {0}")]
    Malformed(String),
    #[error("invalid owner id in session entry `{entry}`")]
    InvalidOwner { entry: String },
}

/// A fixed token table, configured at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticSessions {
    tokens: HashMap<String, Identity>,
}

impl StaticSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, owner: impl Into<OwnerId>) -> Self {
        self.tokens.insert(token.into(), Identity::new(owner));
        self
    }

    /// Parses `token=owner_id` entries.
    pub fn parse<I, S>(entries: I) -> Result<Self, SessionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sessions = Self::new();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            let (token, owner) = entry
                .split_once('=')
                .filter(|(token, _)| !token.is_empty())
                .ok_or_else(|| SessionError::Malformed(entry.to_string()))?;
            let owner: i64 = owner.trim().parse().map_err(|_| SessionError::InvalidOwner {
                entry: entry.to_string(),
            })?;
            sessions = sessions.with_token(token.trim(), owner);
        }
        Ok(sessions)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl SessionStore for StaticSessions {
    async fn identify(&self, token: &str) -> Option<Identity> {
        self.tokens.get(token).copied()
    }
}

use crate::error::{RedirectorError, Result};
use crate::redirector::{Redirector, Resolution, Visit};
use async_trait::async_trait;
use jiff::Timestamp;
use portkey_core::{ClickSink, NewClick, ReadRepository, ShortCode};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, TypedBuilder)]
pub struct RedirectorConfig {
    /// Upper bound for one store lookup on the redirect path.
    #[builder(default = Duration::from_secs(2))]
    pub store_timeout: Duration,
}

impl Default for RedirectorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Service for handling URL redirects.
///
/// Uses a read-only repository to look codes up and a [`ClickSink`] to
/// record visits. Resolution is a pure read; the click is handed off and
/// never awaited.
pub struct RedirectorService<R> {
    repository: Arc<R>,
    clicks: Arc<dyn ClickSink>,
    config: RedirectorConfig,
}

impl<R> fmt::Debug for RedirectorService<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectorService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<R: ReadRepository> RedirectorService<R> {
    pub fn new(repository: Arc<R>, clicks: Arc<dyn ClickSink>) -> Self {
        Self::with_config(repository, clicks, RedirectorConfig::default())
    }

    pub fn with_config(
        repository: Arc<R>,
        clicks: Arc<dyn ClickSink>,
        config: RedirectorConfig,
    ) -> Self {
        Self {
            repository,
            clicks,
            config,
        }
    }

    /// Resolves a short code, see [`Redirector::resolve`].
    pub async fn resolve(&self, code: &ShortCode, visit: Visit) -> Result<Resolution> {
        Redirector::resolve(self, code, visit).await
    }

    /// Resolves a short code without recording a visit, see [`Redirector::peek`].
    pub async fn peek(&self, code: &ShortCode) -> Result<Resolution> {
        Redirector::peek(self, code).await
    }

    async fn lookup(&self, code: &ShortCode) -> Result<Resolution> {
        trace!(code = %code, "resolving short code");

        let lookup = tokio::time::timeout(self.config.store_timeout, self.repository.lookup(code));
        let record = match lookup.await {
            Ok(result) => result?,
            Err(_) => {
                warn!(code = %code, timeout = ?self.config.store_timeout, "store lookup timed out");
                return Err(RedirectorError::Timeout(self.config.store_timeout));
            }
        };

        let Some(record) = record else {
            trace!(code = %code, "short code not found");
            return Ok(Resolution::NotFound);
        };

        if record.is_deleted() {
            debug!(code = %code, url_id = %record.id, "short code was deleted");
            return Ok(Resolution::Gone);
        }

        debug!(code = %code, url = %record.original_url, "resolved short code");
        Ok(Resolution::Redirect(record))
    }
}

#[async_trait]
impl<R: ReadRepository> Redirector for RedirectorService<R> {
    async fn resolve(&self, code: &ShortCode, visit: Visit) -> Result<Resolution> {
        let resolution = self.lookup(code).await?;
        if let Resolution::Redirect(record) = &resolution {
            self.clicks.record(NewClick {
                short_url_id: record.id,
                clicked_at: Timestamp::now(),
                ip_address: visit.ip_address,
                user_agent: visit.user_agent,
            });
        }
        Ok(resolution)
    }

    async fn peek(&self, code: &ShortCode) -> Result<Resolution> {
        self.lookup(code).await
    }
}

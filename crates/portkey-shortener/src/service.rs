use crate::error::{Result, ShortenerError};
use crate::shortener::Shortener;
use crate::validate::normalize_url;
use async_trait::async_trait;
use jiff::Timestamp;
use portkey_core::access::{authorize_owner, require_identity};
use portkey_core::{
    Identity, NewShortUrl, ShortCode, ShortUrl, StorageError, UrlId, UrlRepository,
};
use portkey_generator::Generator;
use std::sync::Arc;
use tracing::{error, info, warn};
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, TypedBuilder)]
pub struct ShortenerConfig {
    /// How many freshly generated codes are tried before giving up.
    #[builder(default = 5)]
    pub max_attempts: u32,
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A concrete implementation of the `Shortener` trait.
///
/// This service wraps a `UrlRepository` and a `Generator` to handle:
/// - URL validation and normalisation
/// - Short code generation with bounded retry on collision
/// - Ownership checks for listing and deletion
///
/// Uniqueness is decided by the repository's atomic insert. A `Conflict`
/// means another record holds the candidate code, so a new one is drawn.
#[derive(Debug)]
pub struct ShortenerService<R, G> {
    repository: Arc<R>,
    generator: G,
    config: ShortenerConfig,
}

impl<R: UrlRepository, G: Generator> ShortenerService<R, G> {
    pub fn new(repository: Arc<R>, generator: G) -> Self {
        Self::with_config(repository, generator, ShortenerConfig::default())
    }

    pub fn with_config(repository: Arc<R>, generator: G, config: ShortenerConfig) -> Self {
        Self {
            repository,
            generator,
            config,
        }
    }

    /// Fetches a record for an owner operation.
    ///
    /// Checks run in the order Unauthenticated, NotFound, Forbidden.
    async fn owned_record(&self, id: UrlId, requester: Option<&Identity>) -> Result<ShortUrl> {
        require_identity(requester)?;

        let record = self
            .repository
            .get(id)
            .await?
            .filter(|record| !record.is_deleted())
            .ok_or(ShortenerError::NotFound)?;

        authorize_owner(requester, &record)?;
        Ok(record)
    }
}

#[async_trait]
impl<R: UrlRepository, G: Generator> Shortener for ShortenerService<R, G> {
    async fn create(&self, requester: Option<&Identity>, original_url: &str) -> Result<ShortUrl> {
        let owner = require_identity(requester)?.owner_id;
        let original_url = normalize_url(original_url)?;
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            let code: ShortCode = self.generator.generate().into();
            let record = NewShortUrl {
                code: code.clone(),
                original_url: original_url.clone(),
                owner_id: owner,
                created_at: Timestamp::now(),
            };

            match self.repository.insert(record).await {
                Ok(stored) => {
                    info!(code = %stored.code, url_id = %stored.id, owner_id = %owner, "short url created");
                    return Ok(stored);
                }
                Err(StorageError::Conflict(_)) => {
                    warn!(code = %code, attempt, "short code collision, regenerating");
                }
                Err(err) => return Err(err.into()),
            }
        }

        error!(attempts, "short code space exhausted");
        Err(ShortenerError::GenerationExhausted { attempts })
    }

    async fn get_by_code(&self, code: &ShortCode) -> Result<ShortUrl> {
        self.repository
            .lookup(code)
            .await?
            .filter(|record| !record.is_deleted())
            .ok_or(ShortenerError::NotFound)
    }

    async fn list_by_owner(&self, requester: Option<&Identity>) -> Result<Vec<ShortUrl>> {
        let owner = require_identity(requester)?.owner_id;
        Ok(self.repository.list_by_owner(owner).await?)
    }

    async fn soft_delete(&self, id: UrlId, requester: Option<&Identity>) -> Result<ShortUrl> {
        let record = self.owned_record(id, requester).await?;

        // A concurrent delete may win between the check and the update.
        let deleted = self
            .repository
            .soft_delete(record.id)
            .await?
            .ok_or(ShortenerError::NotFound)?;

        info!(code = %deleted.code, url_id = %deleted.id, "short url deleted");
        Ok(deleted)
    }
}

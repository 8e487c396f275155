use portkey_core::{AccessError, StorageError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[derive(Debug, Clone, Error)]
pub enum AnalyticsError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("short url not found")]
    NotFound,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

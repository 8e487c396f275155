use portkey_core::{AccessError, StorageError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShortenerError>;

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("short url not found")]
    NotFound,
    #[error("no free short code after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

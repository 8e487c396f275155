use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
}

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out: {0}")]
    Timeout(String),
    #[error("cache value is invalid: {0}")]
    InvalidData(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
}

/// Errors returned by repository implementations.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("short code already taken: {0}")]
    Conflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    /// Whether retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Unavailable(_)
            | StorageError::Timeout(_)
            | StorageError::Query(_)
            | StorageError::Cache(_)
            | StorageError::Operation(_) => true,
            StorageError::Conflict(_) | StorageError::InvalidData(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_and_bad_rows_are_not_transient() {
        assert!(!StorageError::Conflict("abc".into()).is_transient());
        assert!(!StorageError::InvalidData("bad row".into()).is_transient());
    }

    #[test]
    fn backend_failures_are_transient() {
        assert!(StorageError::Unavailable("down".into()).is_transient());
        assert!(StorageError::Timeout("slow".into()).is_transient());
        assert!(StorageError::Cache(CacheError::Timeout("slow".into())).is_transient());
    }
}

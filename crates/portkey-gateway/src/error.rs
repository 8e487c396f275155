use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use portkey_analytics::AnalyticsError;
use portkey_core::{AccessError, StorageError};
use portkey_redirector::RedirectorError;
use portkey_shortener::ShortenerError;
use thiserror::Error;
use tracing::{error, warn};

pub type Result<T> = std::result::Result<T, AppError>;

/// Every failure the HTTP surface reports.
///
/// Bodies are `{"error": "<message>"}`. Server-side details are logged and
/// never sent to the client.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidUrl(String),
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("You do not have permission to access this URL")]
    Forbidden,
    #[error("CSRF verification failed")]
    Csrf,
    #[error("{0}")]
    NotFound(&'static str),
    #[error("Short URL is no longer available")]
    Gone,
    #[error("no free short code after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidUrl(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden | AppError::Csrf => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Gone => StatusCode::GONE,
            AppError::GenerationExhausted { .. } | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::GenerationExhausted { .. } | AppError::Internal(_) => {
                "An error occurred".to_string()
            }
            AppError::Unavailable(_) => "Service temporarily unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::GenerationExhausted { attempts } => {
                error!(attempts, "short code space exhausted")
            }
            AppError::Unavailable(detail) => warn!(error = %detail, "storage unavailable"),
            AppError::Internal(detail) => error!(error = %detail, "request failed"),
            _ => {}
        }

        let body = Json(serde_json::json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable(_) | StorageError::Timeout(_) | StorageError::Cache(_) => {
                AppError::Unavailable(err.to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated => AppError::Unauthenticated,
            AccessError::Forbidden => AppError::Forbidden,
        }
    }
}

impl From<ShortenerError> for AppError {
    fn from(err: ShortenerError) -> Self {
        match err {
            ShortenerError::InvalidUrl(message) => AppError::InvalidUrl(message),
            ShortenerError::Access(access) => access.into(),
            ShortenerError::NotFound => AppError::NotFound("URL not found"),
            ShortenerError::GenerationExhausted { attempts } => {
                AppError::GenerationExhausted { attempts }
            }
            ShortenerError::Storage(storage) => storage.into(),
        }
    }
}

impl From<AnalyticsError> for AppError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::Access(access) => access.into(),
            AnalyticsError::NotFound => AppError::NotFound("URL not found"),
            AnalyticsError::Storage(storage) => storage.into(),
        }
    }
}

impl From<RedirectorError> for AppError {
    fn from(err: RedirectorError) -> Self {
        match err {
            RedirectorError::Timeout(_) => AppError::Unavailable(err.to_string()),
            RedirectorError::Storage(storage) => storage.into(),
        }
    }
}

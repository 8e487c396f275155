use axum::extract::{Path, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use portkey_core::ShortCode;
use portkey_redirector::Resolution;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::extract::ClientInfo;
use crate::state::AppState;

const NOT_FOUND: &str = "Short URL not found";

/// Also serves HEAD through the GET route. Link checkers and previews
/// issue HEAD, so only GET counts as a visit.
pub async fn redirect_handler(
    method: Method,
    Path(code): Path<String>,
    State(state): State<AppState>,
    ClientInfo(visit): ClientInfo,
) -> Result<Response> {
    // Strings that can never be a code are simply unknown.
    let code = ShortCode::new(&code).map_err(|_| AppError::NotFound(NOT_FOUND))?;

    let resolution = if method == Method::HEAD {
        state.redirector().peek(&code).await?
    } else {
        state.redirector().resolve(&code, visit).await?
    };

    match resolution {
        Resolution::Redirect(url) => {
            let location = HeaderValue::from_str(&url.original_url)
                .map_err(|e| AppError::Internal(format!("unusable redirect target: {e}")))?;
            debug!(code = %code, url_id = %url.id, "redirecting");
            Ok((StatusCode::FOUND, [(LOCATION, location)]).into_response())
        }
        Resolution::Gone => Err(AppError::Gone),
        Resolution::NotFound => Err(AppError::NotFound(NOT_FOUND)),
    }
}

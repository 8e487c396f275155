use axum::extract::Request;
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::CookieJar;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::AppError;
use crate::extract::bearer_token;

/// Cookie set by the accounts service.
pub const CSRF_COOKIE: &str = "csrftoken";
/// Header the dashboard echoes the cookie value in.
pub const CSRF_HEADER: &str = "x-csrftoken";

/// Double-submit CSRF check for unsafe methods.
///
/// Requests authenticated with a `Bearer` token carry no ambient
/// credentials and are let through.
pub async fn csrf_guard(request: Request, next: Next) -> Result<Response, AppError> {
    if is_safe(request.method()) || bearer_token(request.headers()).is_some() {
        return Ok(next.run(request).await);
    }

    let rejection = {
        let cookie = CookieJar::from_headers(request.headers())
            .get(CSRF_COOKIE)
            .map(|cookie| cookie.value().to_owned());
        let header = request
            .headers()
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok());

        match (cookie.as_deref(), header) {
            (Some(cookie), Some(header)) if !cookie.is_empty() && tokens_match(cookie, header) => {
                None
            }
            (None, _) | (_, None) => Some("missing CSRF token"),
            _ => Some("CSRF token mismatch"),
        }
    };

    match rejection {
        None => Ok(next.run(request).await),
        Some(reason) => {
            warn!(method = %request.method(), uri = %request.uri(), reason, "rejected request");
            Err(AppError::Csrf)
        }
    }
}

fn is_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

fn tokens_match(cookie: &str, header: &str) -> bool {
    cookie.as_bytes().ct_eq(header.as_bytes()).into()
}

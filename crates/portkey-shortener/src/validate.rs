use crate::error::{Result, ShortenerError};
use std::borrow::Cow;
use url::Url;

/// Longest URL accepted after normalisation.
pub const MAX_URL_LENGTH: usize = 2048;

/// Validates a submitted URL and returns the form to store.
///
/// Input is trimmed and `https://` is prepended when no scheme is given.
/// The result must parse as an absolute http(s) URL with a host. Plain
/// ASCII input is stored exactly as submitted; anything else (IDN hosts,
/// unescaped spaces) is stored in its serialised, percent-encoded form so
/// it can travel in a `Location` header.
pub fn normalize_url(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ShortenerError::InvalidUrl(
            "original_url is required".to_string(),
        ));
    }

    let candidate = if trimmed.contains("://") {
        Cow::Borrowed(trimmed)
    } else {
        Cow::Owned(format!("https://{trimmed}"))
    };

    let parsed = Url::parse(&candidate)
        .map_err(|e| ShortenerError::InvalidUrl(format!("{e}: {trimmed}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL scheme must be http or https: {other}"
            )))
        }
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ShortenerError::InvalidUrl(format!(
            "URL must have a host: {trimmed}"
        )));
    }

    let stored = if candidate.bytes().all(|b| b.is_ascii_graphic()) {
        candidate.into_owned()
    } else {
        parsed.into()
    };

    if stored.len() > MAX_URL_LENGTH {
        return Err(ShortenerError::InvalidUrl(format!(
            "URL is longer than {MAX_URL_LENGTH} characters"
        )));
    }

    Ok(stored)
}

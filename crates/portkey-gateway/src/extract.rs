use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::{AUTHORIZATION, USER_AGENT};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum_extra::extract::CookieJar;
use portkey_core::Identity;
use portkey_redirector::Visit;
use tracing::trace;

use crate::session::SESSION_COOKIE;
use crate::state::AppState;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// The caller's identity, if the session collaborator recognises them.
///
/// A `Bearer` token wins over the session cookie. Unknown tokens are
/// anonymous, so the ownership gate decides what to reject.
#[derive(Debug, Clone, Copy)]
pub struct Requester(pub Option<Identity>);

impl Requester {
    pub fn identity(&self) -> Option<&Identity> {
        self.0.as_ref()
    }
}

impl FromRequestParts<AppState> for Requester {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).map(str::to_owned).or_else(|| {
            CookieJar::from_headers(&parts.headers)
                .get(SESSION_COOKIE)
                .map(|cookie| cookie.value().to_owned())
        });

        let identity = match token {
            Some(token) => state.sessions().identify(&token).await,
            None => None,
        };
        trace!(authenticated = identity.is_some(), "resolved requester");
        Ok(Requester(identity))
    }
}

/// Visitor metadata recorded with a click.
#[derive(Debug, Clone)]
pub struct ClientInfo(pub Visit);

impl<S: Send + Sync> FromRequestParts<S> for ClientInfo {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_owned);

        Ok(ClientInfo(Visit {
            ip_address: forwarded_ip(&parts.headers).or(peer),
            user_agent,
        }))
    }
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// First hop of `X-Forwarded-For`. Unparseable values are ignored.
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get(FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

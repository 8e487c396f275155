use std::net::IpAddr;

use jiff::Timestamp;
use portkey_core::{ClickEvent, Page, ShortCode, ShortUrl, UrlId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateUrlRequest {
    #[serde(default)]
    pub original_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateUrlResponse {
    pub id: UrlId,
    pub code: ShortCode,
    pub short_code: ShortCode,
    pub short_url: String,
    pub original_url: String,
    pub created_at: Timestamp,
}

impl CreateUrlResponse {
    pub fn new(url: ShortUrl, short_url: String) -> Self {
        Self {
            id: url.id,
            code: url.code.clone(),
            short_code: url.code,
            short_url,
            original_url: url.original_url,
            created_at: url.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListUrlsResponse {
    pub count: usize,
    pub urls: Vec<UrlSummary>,
}

#[derive(Debug, Serialize)]
pub struct UrlSummary {
    pub id: UrlId,
    pub code: ShortCode,
    pub short_url: String,
    pub original_url: String,
    pub created_at: Timestamp,
    pub clicks: u64,
}

/// Optional window over the click list; the total is always exact.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl From<AnalyticsQuery> for Page {
    fn from(query: AnalyticsQuery) -> Self {
        Page {
            offset: query.offset.unwrap_or(0),
            limit: query.limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub id: UrlId,
    pub code: ShortCode,
    pub short_url: String,
    pub original_url: String,
    pub created_at: Timestamp,
    pub total_clicks: u64,
    pub clicks: Vec<ClickResponse>,
}

#[derive(Debug, Serialize)]
pub struct ClickResponse {
    pub clicked_at: Timestamp,
    pub ip_address: Option<IpAddr>,
    pub user_agent: Option<String>,
}

impl From<ClickEvent> for ClickResponse {
    fn from(event: ClickEvent) -> Self {
        Self {
            clicked_at: event.clicked_at,
            ip_address: event.ip_address,
            user_agent: event.user_agent,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteUrlResponse {
    pub message: String,
}

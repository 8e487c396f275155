mod account;
mod health;
mod url;

pub use account::{CurrentUserResponse, UserSummary};
pub use health::HealthResponse;
pub use url::{
    AnalyticsQuery, AnalyticsResponse, ClickResponse, CreateUrlRequest, CreateUrlResponse,
    DeleteUrlResponse, ListUrlsResponse, UrlSummary,
};

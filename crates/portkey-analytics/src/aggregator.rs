use crate::error::{AnalyticsError, Result};
use async_trait::async_trait;
use portkey_core::access::{authorize_owner, require_identity};
use portkey_core::{
    ClickEvent, ClickRepository, Identity, Page, ReadRepository, ShortUrl, UrlId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Exact click totals keyed by URL.
pub type UrlClicks = HashMap<UrlId, u64>;

/// Click analytics of one short URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlAnalytics {
    pub url: ShortUrl,
    /// Exact number of recorded clicks, regardless of the requested page.
    pub total_clicks: u64,
    /// Newest first.
    pub clicks: Vec<ClickEvent>,
}

#[async_trait]
pub trait Analytics: Send + Sync + 'static {
    /// Click totals and details for a URL owned by the requester.
    async fn get_analytics(
        &self,
        id: UrlId,
        requester: Option<&Identity>,
        page: Page,
    ) -> Result<UrlAnalytics>;

    /// Click totals for several URLs, all of which must belong to the requester.
    async fn click_totals(
        &self,
        requester: Option<&Identity>,
        urls: &[ShortUrl],
    ) -> Result<UrlClicks>;
}

/// Derives analytics from the click log on every call.
///
/// Totals are counted from the stored events, never from a separately
/// maintained counter.
#[derive(Debug)]
pub struct Aggregator<U, C> {
    urls: Arc<U>,
    clicks: Arc<C>,
}

impl<U: ReadRepository, C: ClickRepository> Aggregator<U, C> {
    pub fn new(urls: Arc<U>, clicks: Arc<C>) -> Self {
        Self { urls, clicks }
    }
}

#[async_trait]
impl<U: ReadRepository, C: ClickRepository> Analytics for Aggregator<U, C> {
    async fn get_analytics(
        &self,
        id: UrlId,
        requester: Option<&Identity>,
        page: Page,
    ) -> Result<UrlAnalytics> {
        require_identity(requester)?;

        let url = self
            .urls
            .get(id)
            .await?
            .filter(|url| !url.is_deleted())
            .ok_or(AnalyticsError::NotFound)?;

        authorize_owner(requester, &url)?;

        let clicks = self.clicks.list(id, page).await?;
        let total_clicks = if page.is_all() {
            clicks.len() as u64
        } else {
            self.clicks.count(id).await?
        };

        debug!(url_id = %id, total_clicks, returned = clicks.len(), "analytics computed");
        Ok(UrlAnalytics {
            url,
            total_clicks,
            clicks,
        })
    }

    async fn click_totals(
        &self,
        requester: Option<&Identity>,
        urls: &[ShortUrl],
    ) -> Result<UrlClicks> {
        require_identity(requester)?;
        for url in urls {
            authorize_owner(requester, url)?;
        }

        let ids: Vec<UrlId> = urls.iter().map(|url| url.id).collect();
        Ok(self.clicks.count_many(&ids).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::{SignedDuration, Timestamp};
    use portkey_core::{AccessError, NewClick, NewShortUrl, OwnerId, ShortCode, UrlRepository};
    use portkey_storage::InMemoryRepository;

    struct Fixture {
        repo: Arc<InMemoryRepository>,
        aggregator: Aggregator<InMemoryRepository, InMemoryRepository>,
    }

    impl Fixture {
        fn new() -> Self {
            let repo = Arc::new(InMemoryRepository::new());
            let aggregator = Aggregator::new(Arc::clone(&repo), Arc::clone(&repo));
            Self { repo, aggregator }
        }

        async fn url(&self, code: &str, owner: i64) -> ShortUrl {
            self.repo
                .insert(NewShortUrl {
                    code: ShortCode::new_unchecked(code),
                    original_url: format!("https://example.com/{code}"),
                    owner_id: OwnerId::new(owner),
                    created_at: Timestamp::now(),
                })
                .await
                .unwrap()
        }

        async fn clicks(&self, url: UrlId, n: i64) -> Timestamp {
            let base = Timestamp::now();
            for i in 0..n {
                self.repo
                    .append(NewClick {
                        short_url_id: url,
                        clicked_at: base + SignedDuration::from_secs(i),
                        ip_address: None,
                        user_agent: None,
                    })
                    .await
                    .unwrap();
            }
            base
        }
    }

    fn alice() -> Identity {
        Identity::new(1)
    }

    fn bob() -> Identity {
        Identity::new(2)
    }

    #[tokio::test]
    async fn totals_match_recorded_clicks() {
        let fixture = Fixture::new();
        let url = fixture.url("abc1234", 1).await;
        let base = fixture.clicks(url.id, 7).await;

        let analytics = fixture
            .aggregator
            .get_analytics(url.id, Some(&alice()), Page::ALL)
            .await
            .unwrap();

        assert_eq!(analytics.url, url);
        assert_eq!(analytics.total_clicks, 7);
        assert_eq!(analytics.clicks.len(), 7);
        assert_eq!(
            analytics.clicks[0].clicked_at,
            base + SignedDuration::from_secs(6)
        );
    }

    #[tokio::test]
    async fn url_without_clicks_has_zero_total() {
        let fixture = Fixture::new();
        let url = fixture.url("quiet12", 1).await;

        let analytics = fixture
            .aggregator
            .get_analytics(url.id, Some(&alice()), Page::ALL)
            .await
            .unwrap();

        assert_eq!(analytics.total_clicks, 0);
        assert!(analytics.clicks.is_empty());
    }

    #[tokio::test]
    async fn paged_clicks_keep_exact_total() {
        let fixture = Fixture::new();
        let url = fixture.url("paged12", 1).await;
        fixture.clicks(url.id, 10).await;

        let analytics = fixture
            .aggregator
            .get_analytics(
                url.id,
                Some(&alice()),
                Page {
                    offset: 2,
                    limit: Some(3),
                },
            )
            .await
            .unwrap();

        assert_eq!(analytics.total_clicks, 10);
        assert_eq!(analytics.clicks.len(), 3);
    }

    #[tokio::test]
    async fn non_owner_is_forbidden_regardless_of_clicks() {
        let fixture = Fixture::new();
        let url = fixture.url("abc1234", 1).await;
        fixture.clicks(url.id, 3).await;

        let err = fixture
            .aggregator
            .get_analytics(url.id, Some(&bob()), Page::ALL)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::Access(AccessError::Forbidden)));
    }

    #[tokio::test]
    async fn check_order_is_unauthenticated_then_not_found() {
        let fixture = Fixture::new();

        assert!(matches!(
            fixture
                .aggregator
                .get_analytics(UrlId::new(42), None, Page::ALL)
                .await,
            Err(AnalyticsError::Access(AccessError::Unauthenticated))
        ));
        assert!(matches!(
            fixture
                .aggregator
                .get_analytics(UrlId::new(42), Some(&bob()), Page::ALL)
                .await,
            Err(AnalyticsError::NotFound)
        ));
    }

    #[tokio::test]
    async fn deleted_url_is_not_found_but_keeps_clicks() {
        let fixture = Fixture::new();
        let url = fixture.url("abc1234", 1).await;
        fixture.clicks(url.id, 2).await;
        fixture.repo.soft_delete(url.id).await.unwrap();

        let err = fixture
            .aggregator
            .get_analytics(url.id, Some(&alice()), Page::ALL)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::NotFound));
        assert_eq!(fixture.repo.count(url.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn click_totals_for_own_urls() {
        let fixture = Fixture::new();
        let busy = fixture.url("busy123", 1).await;
        let idle = fixture.url("idle123", 1).await;
        fixture.clicks(busy.id, 4).await;

        let totals = fixture
            .aggregator
            .click_totals(Some(&alice()), &[busy.clone(), idle.clone()])
            .await
            .unwrap();

        assert_eq!(totals[&busy.id], 4);
        assert_eq!(totals[&idle.id], 0);
    }

    #[tokio::test]
    async fn click_totals_reject_foreign_urls() {
        let fixture = Fixture::new();
        let foreign = fixture.url("other12", 2).await;

        let err = fixture
            .aggregator
            .click_totals(Some(&alice()), &[foreign])
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::Access(AccessError::Forbidden)));
    }
}

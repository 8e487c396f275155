use async_trait::async_trait;
use dashmap::DashMap;
use jiff::Timestamp;
use portkey_core::repository::Result;
use portkey_core::{
    ClickEvent, ClickId, ClickRepository, CodeReuse, NewClick, NewShortUrl, OwnerId, Page,
    ReadRepository, ShortCode, ShortUrl, StorageError, UrlId, UrlRepository,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// In-memory implementation of the repository traits using DashMap.
///
/// DashMap provides better concurrency than RwLock<HashMap> because it
/// uses sharded locks, allowing concurrent reads and writes to different
/// buckets without blocking.
///
/// Every code maps to the ids of all records that ever carried it, oldest
/// first. Only the last one can be active. Inserts hold the code's shard
/// lock while checking and appending, which makes check-and-insert atomic.
#[derive(Debug)]
pub struct InMemoryRepository {
    urls: DashMap<UrlId, ShortUrl>,
    codes: DashMap<ShortCode, Vec<UrlId>>,
    clicks: DashMap<UrlId, Vec<ClickEvent>>,
    next_url_id: AtomicI64,
    next_click_id: AtomicI64,
    code_reuse: CodeReuse,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self::with_code_reuse(CodeReuse::default())
    }

    /// Creates a new in-memory repository with the given reuse policy for deleted codes.
    pub fn with_code_reuse(code_reuse: CodeReuse) -> Self {
        Self {
            urls: DashMap::new(),
            codes: DashMap::new(),
            clicks: DashMap::new(),
            next_url_id: AtomicI64::new(1),
            next_click_id: AtomicI64::new(1),
            code_reuse,
        }
    }

    /// Number of records, deleted ones included.
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    fn blocks_code(&self, holder: &ShortUrl, now: Timestamp) -> bool {
        match holder.deleted_at {
            None => true,
            Some(deleted_at) => self.code_reuse.blocks(deleted_at, now),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadRepository for InMemoryRepository {
    async fn lookup(&self, code: &ShortCode) -> Result<Option<ShortUrl>> {
        let Some(latest) = self.codes.get(code).and_then(|ids| ids.last().copied()) else {
            return Ok(None);
        };

        Ok(self.urls.get(&latest).map(|entry| entry.value().clone()))
    }

    async fn get(&self, id: UrlId) -> Result<Option<ShortUrl>> {
        Ok(self.urls.get(&id).map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl UrlRepository for InMemoryRepository {
    async fn insert(&self, record: NewShortUrl) -> Result<ShortUrl> {
        let now = Timestamp::now();
        let mut history = self.codes.entry(record.code.clone()).or_default();

        // Lock order is always codes -> urls.
        if let Some(latest) = history.last() {
            let blocked = self
                .urls
                .get(latest)
                .is_some_and(|holder| self.blocks_code(&holder, now));
            if blocked {
                return Err(StorageError::Conflict(record.code.to_string()));
            }
        }

        let id = UrlId::new(self.next_url_id.fetch_add(1, Ordering::SeqCst));
        let stored = record.into_short_url(id);
        self.urls.insert(id, stored.clone());
        history.push(id);

        Ok(stored)
    }

    async fn list_by_owner(&self, owner: OwnerId) -> Result<Vec<ShortUrl>> {
        let mut owned: Vec<ShortUrl> = self
            .urls
            .iter()
            .filter(|entry| entry.owner_id == owner && !entry.is_deleted())
            .map(|entry| entry.value().clone())
            .collect();

        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(owned)
    }

    async fn soft_delete(&self, id: UrlId) -> Result<Option<ShortUrl>> {
        let Some(mut entry) = self.urls.get_mut(&id) else {
            return Ok(None);
        };

        if entry.is_deleted() {
            return Ok(None);
        }

        entry.deleted_at = Some(Timestamp::now());
        Ok(Some(entry.value().clone()))
    }
}

#[async_trait]
impl ClickRepository for InMemoryRepository {
    async fn append(&self, click: NewClick) -> Result<ClickEvent> {
        if !self.urls.contains_key(&click.short_url_id) {
            return Err(StorageError::Query(format!(
                "short url {} does not exist",
                click.short_url_id
            )));
        }

        let id = ClickId::new(self.next_click_id.fetch_add(1, Ordering::SeqCst));
        let event = click.into_event(id);
        self.clicks
            .entry(event.short_url_id)
            .or_default()
            .push(event.clone());

        Ok(event)
    }

    async fn count(&self, url: UrlId) -> Result<u64> {
        Ok(self.clicks.get(&url).map_or(0, |events| events.len() as u64))
    }

    async fn count_many(&self, urls: &[UrlId]) -> Result<HashMap<UrlId, u64>> {
        let mut counts = HashMap::with_capacity(urls.len());
        for url in urls {
            counts.insert(*url, self.count(*url).await?);
        }
        Ok(counts)
    }

    async fn list(&self, url: UrlId, page: Page) -> Result<Vec<ClickEvent>> {
        let mut events = self
            .clicks
            .get(&url)
            .map(|events| events.value().clone())
            .unwrap_or_default();

        events.sort_by(|a, b| b.clicked_at.cmp(&a.clicked_at).then(b.id.cmp(&a.id)));

        let limit = page.limit.map_or(usize::MAX, |limit| limit as usize);
        Ok(events
            .into_iter()
            .skip(page.offset as usize)
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn new_url(c: &str, url: &str, owner: i64) -> NewShortUrl {
        NewShortUrl {
            code: code(c),
            original_url: url.to_string(),
            owner_id: OwnerId::new(owner),
            created_at: Timestamp::now(),
        }
    }

    fn click(url: UrlId, at: Timestamp) -> NewClick {
        NewClick {
            short_url_id: url,
            clicked_at: at,
            ip_address: Some("203.0.113.7".parse().unwrap()),
            user_agent: Some("curl/8.0".to_string()),
        }
    }

    #[tokio::test]
    async fn insert_and_lookup() {
        let repo = InMemoryRepository::new();

        let stored = repo
            .insert(new_url("abc1234", "https://example.com/", 1))
            .await
            .unwrap();

        let found = repo.lookup(&code("abc1234")).await.unwrap().unwrap();
        assert_eq!(found, stored);
        assert_eq!(found.deleted_at, None);
        assert_eq!(repo.get(stored.id).await.unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn lookup_nonexistent() {
        let repo = InMemoryRepository::new();
        assert!(repo.lookup(&code("nope1234")).await.unwrap().is_none());
        assert!(repo.get(UrlId::new(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_conflict() {
        let repo = InMemoryRepository::new();

        repo.insert(new_url("abc1234", "https://example.com/", 1))
            .await
            .unwrap();

        let err = repo
            .insert(new_url("abc1234", "https://other.com/", 2))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn soft_delete_keeps_record_visible_to_lookup() {
        let repo = InMemoryRepository::new();
        let stored = repo
            .insert(new_url("abc1234", "https://example.com/", 1))
            .await
            .unwrap();

        let deleted = repo.soft_delete(stored.id).await.unwrap().unwrap();
        assert!(deleted.deleted_at.is_some());

        let found = repo.lookup(&code("abc1234")).await.unwrap().unwrap();
        assert!(found.is_deleted());

        // Second delete is a no-op.
        assert!(repo.soft_delete(stored.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleted_code_is_never_reused_by_default() {
        let repo = InMemoryRepository::new();
        let stored = repo
            .insert(new_url("abc1234", "https://example.com/", 1))
            .await
            .unwrap();
        repo.soft_delete(stored.id).await.unwrap();

        let err = repo
            .insert(new_url("abc1234", "https://other.com/", 2))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn deleted_code_is_reusable_after_embargo() {
        let repo = InMemoryRepository::with_code_reuse(CodeReuse::AfterEmbargo(
            SignedDuration::ZERO,
        ));
        let first = repo
            .insert(new_url("abc1234", "https://example.com/", 1))
            .await
            .unwrap();
        repo.soft_delete(first.id).await.unwrap();

        let second = repo
            .insert(new_url("abc1234", "https://other.com/", 2))
            .await
            .unwrap();
        assert_ne!(first.id, second.id);

        let found = repo.lookup(&code("abc1234")).await.unwrap().unwrap();
        assert_eq!(found.id, second.id);
        assert!(!found.is_deleted());
    }

    #[tokio::test]
    async fn deleted_code_is_blocked_during_embargo() {
        let repo = InMemoryRepository::with_code_reuse(CodeReuse::AfterEmbargo(
            SignedDuration::from_hours(24),
        ));
        let first = repo
            .insert(new_url("abc1234", "https://example.com/", 1))
            .await
            .unwrap();
        repo.soft_delete(first.id).await.unwrap();

        let err = repo
            .insert(new_url("abc1234", "https://other.com/", 2))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn oversized_embargo_blocks_instead_of_panicking() {
        let repo = InMemoryRepository::with_code_reuse(CodeReuse::AfterEmbargo(
            SignedDuration::from_secs(i64::MAX),
        ));
        let first = repo
            .insert(new_url("abcd123", "https://example.com/", 1))
            .await
            .unwrap();
        repo.soft_delete(first.id).await.unwrap();

        let err = repo
            .insert(new_url("abcd123", "https://other.com/", 2))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_by_owner_is_newest_first_and_skips_deleted() {
        let repo = InMemoryRepository::new();
        let base = Timestamp::now();

        let mut older = new_url("old12345", "https://example.com/old", 1);
        older.created_at = base - SignedDuration::from_secs(60);
        let mut newer = new_url("new12345", "https://example.com/new", 1);
        newer.created_at = base;
        let gone = new_url("gone1234", "https://example.com/gone", 1);
        let foreign = new_url("other123", "https://example.com/other", 2);

        let older = repo.insert(older).await.unwrap();
        let newer = repo.insert(newer).await.unwrap();
        let gone = repo.insert(gone).await.unwrap();
        repo.insert(foreign).await.unwrap();
        repo.soft_delete(gone.id).await.unwrap();

        let listed = repo.list_by_owner(OwnerId::new(1)).await.unwrap();
        let ids: Vec<UrlId> = listed.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn clicks_are_counted_and_listed_newest_first() {
        let repo = InMemoryRepository::new();
        let url = repo
            .insert(new_url("abc1234", "https://example.com/", 1))
            .await
            .unwrap();
        let base = Timestamp::now();

        for offset in [0, 30, 10] {
            repo.append(click(url.id, base + SignedDuration::from_secs(offset)))
                .await
                .unwrap();
        }

        assert_eq!(repo.count(url.id).await.unwrap(), 3);

        let listed = repo.list(url.id, Page::ALL).await.unwrap();
        let times: Vec<Timestamp> = listed.iter().map(|c| c.clicked_at).collect();
        assert_eq!(
            times,
            vec![
                base + SignedDuration::from_secs(30),
                base + SignedDuration::from_secs(10),
                base,
            ]
        );

        let window = repo
            .list(
                url.id,
                Page {
                    offset: 1,
                    limit: Some(1),
                },
            )
            .await
            .unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].clicked_at, base + SignedDuration::from_secs(10));
    }

    #[tokio::test]
    async fn clicks_survive_soft_delete() {
        let repo = InMemoryRepository::new();
        let url = repo
            .insert(new_url("abc1234", "https://example.com/", 1))
            .await
            .unwrap();
        repo.append(click(url.id, Timestamp::now())).await.unwrap();

        repo.soft_delete(url.id).await.unwrap();

        assert_eq!(repo.count(url.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn append_rejects_unknown_url() {
        let repo = InMemoryRepository::new();
        let err = repo
            .append(click(UrlId::new(404), Timestamp::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Query(_)));
    }

    #[tokio::test]
    async fn count_many_fills_missing_with_zero() {
        let repo = InMemoryRepository::new();
        let a = repo
            .insert(new_url("aaaa1111", "https://example.com/a", 1))
            .await
            .unwrap();
        let b = repo
            .insert(new_url("bbbb2222", "https://example.com/b", 1))
            .await
            .unwrap();
        repo.append(click(a.id, Timestamp::now())).await.unwrap();
        repo.append(click(a.id, Timestamp::now())).await.unwrap();

        let counts = repo.count_many(&[a.id, b.id]).await.unwrap();
        assert_eq!(counts[&a.id], 2);
        assert_eq!(counts[&b.id], 0);
    }

    #[tokio::test]
    async fn concurrent_inserts_of_same_code_have_one_winner() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut handles = vec![];

        for owner in 0..32 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.insert(new_url("race1234", "https://example.com/", owner))
                    .await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(StorageError::Conflict(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_access() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut handles = vec![];

        for i in 0..10u64 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                let c = format!("code{:04}", i);
                repo.insert(new_url(&c, &format!("https://example{}.com/", i), 1))
                    .await
                    .unwrap();
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        let codes: HashSet<String> = repo
            .list_by_owner(OwnerId::new(1))
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.code.to_string())
            .collect();
        assert_eq!(codes.len(), 10);
    }
}

use crate::retry::{with_retry, RetryPolicy};
use portkey_core::{ClickRepository, ClickSink, NewClick};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Notify, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, TypedBuilder)]
pub struct RecorderConfig {
    /// Clicks buffered between the redirect path and the writer.
    #[builder(default = 10_000)]
    pub queue_capacity: usize,
    /// Concurrent appends against the click repository.
    #[builder(default = 16)]
    pub max_in_flight: usize,
    /// Clicks allowed to wait for queue room once the queue is full.
    /// Beyond this, clicks are dropped so a stalled store cannot exhaust memory.
    #[builder(default = 1_024)]
    pub max_deferred: usize,
    #[builder(default)]
    pub retry: RetryPolicy,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Fire-and-forget [`ClickSink`] backed by a bounded queue.
///
/// `record` never waits on storage. When the queue is full the click is
/// handed to a detached task that waits for room, so it is delayed rather
/// than dropped. At most `max_deferred` clicks wait this way; further
/// clicks are dropped. Clicks are also lost once the recorder has shut down
/// or a write has exhausted its retries. Every loss is logged.
#[derive(Debug, Clone)]
pub struct ClickRecorder {
    tx: mpsc::Sender<NewClick>,
    deferred: Arc<Semaphore>,
}

/// Owns the background writer started by [`ClickRecorder::spawn`].
#[derive(Debug)]
pub struct RecorderHandle {
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl ClickRecorder {
    /// Starts the writer on the current runtime.
    pub fn spawn<R: ClickRepository>(
        repository: Arc<R>,
        config: RecorderConfig,
    ) -> (ClickRecorder, RecorderHandle) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let deferred = Arc::new(Semaphore::new(config.max_deferred));
        let shutdown = Arc::new(Notify::new());

        let task = tokio::spawn(run_writer(repository, rx, Arc::clone(&shutdown), config));

        (ClickRecorder { tx, deferred }, RecorderHandle { shutdown, task })
    }
}

impl ClickSink for ClickRecorder {
    fn record(&self, click: NewClick) {
        match self.tx.try_send(click) {
            Ok(()) => {}
            Err(TrySendError::Full(click)) => {
                let Ok(permit) = Arc::clone(&self.deferred).try_acquire_owned() else {
                    error!(url_id = %click.short_url_id, "click queue and overflow full, click lost");
                    return;
                };
                warn!(url_id = %click.short_url_id, "click queue full, deferring click");
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    let url_id = click.short_url_id;
                    if tx.send(click).await.is_err() {
                        error!(url_id = %url_id, "click recorder stopped, click lost");
                    }
                });
            }
            Err(TrySendError::Closed(click)) => {
                error!(url_id = %click.short_url_id, "click recorder stopped, click lost");
            }
        }
    }
}

impl RecorderHandle {
    /// Stops accepting clicks, writes everything already queued, and waits
    /// for in-flight writes to finish.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.task.await {
            error!(error = %e, "click writer task failed");
        }
    }
}

async fn run_writer<R: ClickRepository>(
    repository: Arc<R>,
    mut rx: mpsc::Receiver<NewClick>,
    shutdown: Arc<Notify>,
    config: RecorderConfig,
) {
    let permits = Arc::new(Semaphore::new(config.max_in_flight.max(1)));
    let mut writes = JoinSet::new();
    let mut closing = false;

    info!(
        queue_capacity = config.queue_capacity,
        max_in_flight = config.max_in_flight,
        "click writer started"
    );

    loop {
        let click = tokio::select! {
            click = rx.recv() => click,
            _ = shutdown.notified(), if !closing => {
                debug!("click writer draining queue");
                closing = true;
                rx.close();
                continue;
            }
        };

        // `None` once every sender is gone or the channel is closed and empty.
        let Some(click) = click else {
            break;
        };

        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };

        let repository = Arc::clone(&repository);
        let policy = config.retry;
        writes.spawn(async move {
            let _permit = permit;
            write_click(repository.as_ref(), click, policy).await;
        });

        while let Some(result) = writes.try_join_next() {
            log_join_error(result);
        }
    }

    while let Some(result) = writes.join_next().await {
        log_join_error(result);
    }

    info!("click writer stopped");
}

async fn write_click<R: ClickRepository>(repository: &R, click: NewClick, policy: RetryPolicy) {
    let url_id = click.short_url_id;

    let result = with_retry("append click", policy, || {
        let click = click.clone();
        async move { repository.append(click).await }
    })
    .await;

    match result {
        Ok(event) => debug!(url_id = %url_id, click_id = %event.id, "click recorded"),
        Err(e) => error!(
            url_id = %url_id,
            attempts = policy.max_attempts,
            error = %e,
            "click write failed, dropping click"
        ),
    }
}

fn log_join_error(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "click write task failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jiff::Timestamp;
    use portkey_core::repository::Result as StorageResult;
    use portkey_core::{
        ClickEvent, NewShortUrl, OwnerId, Page, ShortCode, StorageError, UrlId, UrlRepository,
    };
    use portkey_storage::InMemoryRepository;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    async fn repo_with_url() -> (Arc<InMemoryRepository>, UrlId) {
        let repo = Arc::new(InMemoryRepository::new());
        let url = repo
            .insert(NewShortUrl {
                code: ShortCode::new_unchecked("abc1234"),
                original_url: "https://example.com".to_string(),
                owner_id: OwnerId::new(1),
                created_at: Timestamp::now(),
            })
            .await
            .unwrap();
        (repo, url.id)
    }

    fn click(url: UrlId) -> NewClick {
        NewClick {
            short_url_id: url,
            clicked_at: Timestamp::now(),
            ip_address: Some("192.0.2.10".parse().unwrap()),
            user_agent: Some("test-agent".to_string()),
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::builder()
            .max_attempts(max_attempts)
            .base_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(5))
            .build()
    }

    /// Fails the first `failures` appends with a transient error.
    struct FlakyClicks {
        inner: InMemoryRepository,
        url: UrlId,
        failures: AtomicU32,
        attempts: AtomicU32,
    }

    impl FlakyClicks {
        async fn new(failures: u32) -> Self {
            let inner = InMemoryRepository::new();
            let url = inner
                .insert(NewShortUrl {
                    code: ShortCode::new_unchecked("flaky12"),
                    original_url: "https://example.com".to_string(),
                    owner_id: OwnerId::new(1),
                    created_at: Timestamp::now(),
                })
                .await
                .unwrap();
            Self {
                inner,
                url: url.id,
                failures: AtomicU32::new(failures),
                attempts: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ClickRepository for FlakyClicks {
        async fn append(&self, click: NewClick) -> StorageResult<ClickEvent> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(StorageError::Unavailable("connection reset".into()));
            }
            self.inner.append(click).await
        }

        async fn count(&self, url: UrlId) -> StorageResult<u64> {
            self.inner.count(url).await
        }

        async fn count_many(&self, urls: &[UrlId]) -> StorageResult<HashMap<UrlId, u64>> {
            self.inner.count_many(urls).await
        }

        async fn list(&self, url: UrlId, page: Page) -> StorageResult<Vec<ClickEvent>> {
            self.inner.list(url, page).await
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn recorded_clicks_reach_the_repository() {
        let (repo, url) = repo_with_url().await;
        let (recorder, handle) = ClickRecorder::spawn(Arc::clone(&repo), RecorderConfig::default());

        for _ in 0..20 {
            recorder.record(click(url));
        }

        awaitility::at_most(Duration::from_secs(2))
            .poll_interval(Duration::from_millis(10))
            .until_async(|| async { repo.count(url).await.unwrap() == 20 })
            .await;

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_drains_queued_clicks() {
        let (repo, url) = repo_with_url().await;
        let config = RecorderConfig::builder().max_in_flight(1).build();
        let (recorder, handle) = ClickRecorder::spawn(Arc::clone(&repo), config);

        for _ in 0..200 {
            recorder.record(click(url));
        }
        handle.shutdown().await;

        assert_eq!(repo.count(url).await.unwrap(), 200);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn full_queue_defers_instead_of_dropping() {
        let (repo, url) = repo_with_url().await;
        let config = RecorderConfig::builder()
            .queue_capacity(2)
            .max_in_flight(1)
            .build();
        let (recorder, handle) = ClickRecorder::spawn(Arc::clone(&repo), config);

        for _ in 0..50 {
            recorder.record(click(url));
        }

        awaitility::at_most(Duration::from_secs(2))
            .poll_interval(Duration::from_millis(10))
            .until_async(|| async { repo.count(url).await.unwrap() == 50 })
            .await;

        handle.shutdown().await;
    }

    /// Never completes an append, like a store that has stopped answering.
    struct StalledClicks;

    #[async_trait]
    impl ClickRepository for StalledClicks {
        async fn append(&self, _click: NewClick) -> StorageResult<ClickEvent> {
            std::future::pending().await
        }

        async fn count(&self, _url: UrlId) -> StorageResult<u64> {
            Ok(0)
        }

        async fn count_many(&self, urls: &[UrlId]) -> StorageResult<HashMap<UrlId, u64>> {
            Ok(urls.iter().map(|url| (*url, 0)).collect())
        }

        async fn list(&self, _url: UrlId, _page: Page) -> StorageResult<Vec<ClickEvent>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn stalled_store_keeps_deferred_clicks_bounded() {
        let config = RecorderConfig::builder()
            .queue_capacity(10)
            .max_in_flight(1)
            .max_deferred(16)
            .build();
        let (recorder, _handle) = ClickRecorder::spawn(Arc::new(StalledClicks), config);
        let metrics = tokio::runtime::Handle::current().metrics();

        for _ in 0..10_000 {
            recorder.record(click(UrlId::new(1)));
        }
        tokio::task::yield_now().await;

        // The writer, its one stuck append and at most 16 deferred sends.
        assert!(metrics.num_alive_tasks() <= 18, "{}", metrics.num_alive_tasks());
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let repo = Arc::new(FlakyClicks::new(2).await);
        let url = repo.url;
        let config = RecorderConfig::builder().retry(fast_retry(5)).build();
        let (recorder, handle) = ClickRecorder::spawn(Arc::clone(&repo), config);

        recorder.record(click(url));
        handle.shutdown().await;

        assert_eq!(repo.count(url).await.unwrap(), 1);
        assert_eq!(repo.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_drop_the_click_without_panicking() {
        let repo = Arc::new(FlakyClicks::new(10).await);
        let url = repo.url;
        let config = RecorderConfig::builder().retry(fast_retry(3)).build();
        let (recorder, handle) = ClickRecorder::spawn(Arc::clone(&repo), config);

        recorder.record(click(url));
        handle.shutdown().await;

        assert_eq!(repo.count(url).await.unwrap(), 0);
        assert_eq!(repo.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn record_after_shutdown_is_harmless() {
        let (repo, url) = repo_with_url().await;
        let (recorder, handle) = ClickRecorder::spawn(Arc::clone(&repo), RecorderConfig::default());
        handle.shutdown().await;

        recorder.record(click(url));

        assert_eq!(repo.count(url).await.unwrap(), 0);
    }
}

mod cli;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use jiff::SignedDuration;
use portkey_analytics::{Aggregator, ClickRecorder, RecorderConfig, RetryPolicy};
use portkey_core::{ClickRepository, CodeReuse, UrlRepository};
use portkey_gateway::{App, AppState, StaticSessions};
use portkey_generator::RandomGenerator;
use portkey_redirector::{
    CacheConfig, CachedRepository, MokaUrlCache, RedirectorConfig, RedirectorService,
};
use portkey_shortener::{ShortenerConfig, ShortenerService};
use portkey_storage::{InMemoryRepository, MySqlRepository};
use portkey_telemetry::TelemetryConfig;
use tokio::net::TcpListener;
use tracing::info;

use crate::cli::{StorageBackendArg, CLI};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();

    let telemetry = match &config.otlp_endpoint {
        Some(endpoint) => TelemetryConfig::builder()
            .service_name("portkey-gateway")
            .log_format(config.log_format.into())
            .otlp_endpoint(endpoint.as_str())
            .build(),
        None => TelemetryConfig::builder()
            .service_name("portkey-gateway")
            .log_format(config.log_format.into())
            .build(),
    };
    let _telemetry = portkey_telemetry::init(telemetry).context("failed to initialise telemetry")?;

    info!(
        listen_addr = %config.listen_addr,
        base_url = %config.base_url,
        storage_backend = %config.storage,
        "starting gateway server"
    );

    let code_reuse = match config.reuse_embargo_secs {
        Some(secs) => CodeReuse::AfterEmbargo(SignedDuration::from_secs(secs)),
        None => CodeReuse::Never,
    };

    match config.storage {
        StorageBackendArg::InMemory => {
            let repository = InMemoryRepository::with_code_reuse(code_reuse);
            run_server(&config, Arc::new(repository)).await
        }
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let repository = MySqlRepository::connect(mysql_dsn)
                .await
                .context("failed to connect to mysql")?
                .with_code_reuse(code_reuse);
            repository
                .ensure_schema()
                .await
                .context("failed to prepare mysql schema")?;
            run_server(&config, Arc::new(repository)).await
        }
    }
}

async fn run_server<R>(config: &CLI, repository: Arc<R>) -> anyhow::Result<()>
where
    R: UrlRepository + ClickRepository,
{
    let sessions = StaticSessions::parse(&config.session_tokens)?;
    info!(sessions = sessions.len(), "session tokens loaded");

    let cache: MokaUrlCache = CacheConfig::builder()
        .max_capacity(config.cache_capacity)
        .ttl(Duration::from_secs(config.cache_ttl_secs))
        .build()
        .into();
    let cached = Arc::new(CachedRepository::new(Arc::clone(&repository), cache));

    let recorder_config = RecorderConfig::builder()
        .queue_capacity(config.click_queue_capacity)
        .max_deferred(config.click_max_deferred)
        .retry(
            RetryPolicy::builder()
                .max_attempts(config.click_retry_attempts)
                .build(),
        )
        .build();
    let (recorder, recorder_handle) = ClickRecorder::spawn(Arc::clone(&repository), recorder_config);

    let shortener = ShortenerService::with_config(
        Arc::clone(&cached),
        RandomGenerator::new(config.code_length)?,
        ShortenerConfig::builder()
            .max_attempts(config.max_attempts)
            .build(),
    );
    let redirector = RedirectorService::with_config(
        Arc::clone(&cached),
        Arc::new(recorder),
        RedirectorConfig::builder()
            .store_timeout(Duration::from_millis(config.store_timeout_ms))
            .build(),
    );
    let analytics = Aggregator::new(Arc::clone(&repository), Arc::clone(&repository));

    let state = AppState::builder()
        .shortener(Arc::new(shortener))
        .redirector(Arc::new(redirector))
        .analytics(Arc::new(analytics))
        .sessions(Arc::new(sessions))
        .base_url(config.base_url.clone())
        .build();

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "gateway listening");

    axum::serve(
        listener,
        App::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("draining click recorder");
    recorder_handle.shutdown().await;
    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

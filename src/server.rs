//! Process wiring and lifecycle
//!
//! Boot order: config, store (with migrations), blob sink, message bus,
//! cache, token authority, services. Two long-lived tasks — the HTTP
//! server and the consumer loop — share one cancellation token derived
//! from SIGINT/SIGTERM and get a bounded grace period to drain.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api::{self, state::AppState};
use crate::blob::{BlobError, BlobStore};
use crate::bus::iggy::IggyBus;
use crate::bus::{BusError, EventConsumer, EventProducer, TOPIC_DOWNLOAD_TASK_CREATED};
use crate::cache::{Cache, InMemoryCache};
use crate::config::{CacheType, Config, ConfigError};
use crate::fetcher::{FetchError, HttpConfig, HttpFetcher};
use crate::password::PasswordHasher;
use crate::service::{AccountService, TaskService};
use crate::store::{Store, StoreError};
use crate::token::{CachingKeyDirectory, TokenAuthority, TokenError};
use crate::worker;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum BootError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("blob store error: {0}")]
    Blob(#[from] BlobError),

    #[error("message bus error: {0}")]
    Bus(#[from] BusError),

    #[error("token authority error: {0}")]
    Token(#[from] TokenError),

    #[error("fetcher error: {0}")]
    Fetcher(#[from] FetchError),

    #[error("unsupported cache type: {0}")]
    UnsupportedCache(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn run(config_path: Option<PathBuf>) -> Result<(), BootError> {
    let config = match config_path {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    let store = Store::connect(&config.database).await?;
    let blobs = BlobStore::from_config(&config.download)?;

    let bus = Arc::new(IggyBus::connect(&config.mq).await?);
    bus.ensure_topic(TOPIC_DOWNLOAD_TASK_CREATED).await?;

    let cache: Arc<dyn Cache> = match config.cache.cache_type {
        CacheType::InMemory => Arc::new(InMemoryCache::new()),
        CacheType::Redis => {
            return Err(BootError::UnsupportedCache("redis".to_string()));
        }
    };
    let directory = Arc::new(CachingKeyDirectory::new(Arc::new(store.clone()), cache));
    let tokens = Arc::new(TokenAuthority::bootstrap(&store, directory, &config.auth.token).await?);

    let hasher = PasswordHasher::new(config.auth.hash.cost);
    let http_fetcher = HttpFetcher::new(HttpConfig::default())?;

    let accounts = Arc::new(AccountService::new(store.clone(), hasher, tokens.clone()));
    let producer: Arc<dyn EventProducer> = bus.clone();
    let tasks = Arc::new(TaskService::new(store, producer, blobs, http_fetcher));

    let state = AppState::new(accounts, tasks.clone(), tokens);
    let app = api::router(state);

    let cancel = CancellationToken::new();
    tokio::spawn(watch_signals(cancel.clone()));

    let listener = TcpListener::bind(config.http.address).await?;
    info!(address = %config.http.address, "API server listening");

    let shutdown = cancel.clone();
    let http_handle = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;
        if let Err(err) = result {
            error!(error = %err, "HTTP server stopped");
        }
    });

    let consumer: Arc<dyn EventConsumer> = bus;
    let worker_handle = tokio::spawn(worker::run(consumer, tasks, cancel.clone()));

    cancel.cancelled().await;
    info!("Shutting down");

    for (subsystem, handle) in [("http server", http_handle), ("worker", worker_handle)] {
        if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
            warn!(subsystem, "Did not stop within the grace period");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

async fn watch_signals(cancel: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    cancel.cancel();
}

//! Feedline service binary.
//!
//! Wires the storage backend, the home timeline materializer and the hub
//! API together and runs them until Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `feedline.yaml` (or `FEEDLINE_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Open the storage backend; for `PostgreSQL`, run migrations
//! 4. Spawn the materializer loop
//! 5. Serve the hub API
//! 6. On Ctrl-C, signal shutdown and wait for both to stop

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use feedline_api::server::{ServerConfig, start_server};
use feedline_api::state::AppState;
use feedline_core::FeedStore;
use feedline_core::clock::IntervalTicker;
use feedline_core::config::{FeedConfig, LoggingConfig, StorageBackend};
use feedline_core::materializer::Materializer;
use feedline_core::memory::InMemoryStore;
use feedline_db::{PostgresConfig, PostgresPool};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ServerBinError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "feedline.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, storage setup, or the API server
/// fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging depends on it, so failures here are
    //    reported through the returned error only.
    let config = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("feedline-server starting");
    info!(
        backend = ?config.storage.backend,
        port = config.server.port,
        poll_interval_ms = config.materializer.poll_interval_ms,
        batch_size = config.materializer.batch_size,
        settle_delay_ms = config.materializer.settle_delay_ms,
        "Configuration loaded"
    );

    // 3. Open the storage backend and run the services on it.
    match config.storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; all state is lost on exit");
            run(InMemoryStore::new(), &config).await?;
        }
        StorageBackend::Postgres => {
            let pg_config = PostgresConfig::new(&config.storage.postgres_url)
                .with_max_connections(config.storage.max_connections);
            let pool = PostgresPool::connect(&pg_config)
                .await
                .map_err(ServerBinError::from)?;
            pool.run_migrations().await.map_err(ServerBinError::from)?;
            let result = run(pool.feed_store(), &config).await;
            pool.close().await;
            result?;
        }
    }

    info!("feedline-server stopped");
    Ok(())
}

/// Run the materializer and the hub API over `store` until Ctrl-C or an
/// API failure.
async fn run<S: FeedStore>(store: S, config: &FeedConfig) -> Result<(), ServerBinError> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // 4. Spawn the materializer loop.
    let materializer = Materializer::new(store.clone(), config.materializer.clone()).spawn(
        IntervalTicker::new(config.materializer.poll_interval()),
        shutdown_rx.clone(),
    );

    // 5. Serve the hub API.
    let state = Arc::new(AppState::new(store, config.timeline.clone()));
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let mut server =
        tokio::spawn(async move { start_server(&server_config, state, shutdown_rx).await });

    // 6. Wait for Ctrl-C, or for the server to stop on its own.
    let stopped_early = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Shutdown requested"),
                Err(e) => warn!(error = %e, "Ctrl-C handler failed, shutting down"),
            }
            None
        }
        joined = &mut server => {
            error!("Hub API stopped before shutdown was requested");
            Some(joined)
        }
    };
    shutdown_tx.send_replace(true);

    let served = match stopped_early {
        Some(joined) => joined,
        None => server.await,
    };
    materializer.await?;
    served??;
    Ok(())
}

/// Load configuration from `FEEDLINE_CONFIG` or `feedline.yaml`.
///
/// A missing file is not an error: defaults are used and environment
/// overrides still apply.
fn load_config() -> Result<FeedConfig, ServerBinError> {
    let path = std::env::var_os("FEEDLINE_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        Ok(FeedConfig::from_file(&path)?)
    } else {
        Ok(FeedConfig::parse("")?)
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

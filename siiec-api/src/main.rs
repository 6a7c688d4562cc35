//! siiec API Server
//!
//! Receives hybrid-encrypted incident reports and serves them to the back
//! office. Envelopes are stored as received; they are opened only when a
//! private key is configured.
//!
//! Configuration (environment variables):
//!   SIIEC_PORT                - Listen port (default: 3001)
//!   SIIEC_DATA_DIR            - Persistent data directory (default: ./siiec-data)
//!   SIIEC_PRIVATE_KEY         - Private key PEM, literal `\n` allowed
//!   SIIEC_PRIVATE_KEY_PATH    - Private key PEM file
//!   SIIEC_PUBLIC_KEY_PATH     - Public key served to clients (default: derived)
//!   SIIEC_MAX_ENVELOPE_BYTES  - Envelope size ceiling (default: 16 MiB)
//!   SIIEC_ALLOWED_ORIGINS     - Comma-separated CORS origins
//!   SIIEC_LOG_FORMAT          - "json" for structured logging, "pretty" for dev
//!   SIIEC_ENV                 - "development" exposes internal error detail
//!
//! Without a usable private key the server still accepts reports and keeps
//! them encrypted; /api/health reports decryption as unavailable.

mod config;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use siiec_envelope::KeyProvider;
use siiec_store::{FileBackend, ReportStore};

use crate::config::{LogFormat, ServerConfig};
use crate::routes::{app, AppState};

fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "siiec_api=info,siiec_store=info,siiec_envelope=info,tower_http=info".into()
    });
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env()?;
    init_tracing(config.log_format);

    let keys = KeyProvider::load(&config.keys);
    let backend = FileBackend::new(config.reports_dir())
        .with_context(|| format!("opening report directory {}", config.reports_dir().display()))?;
    let store = ReportStore::new(Arc::new(backend), keys).with_max_envelope_bytes(config.max_envelope_bytes);

    let state = Arc::new(AppState::new(store, config.development));
    let router = app(state.clone(), &config);

    tracing::info!(
        port = config.port,
        decryption = state.store.is_decryption_available(),
        max_envelope_bytes = config.max_envelope_bytes,
        "starting siiec API server v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!(data_dir = %config.data_dir.display(), "data directory");
    tracing::info!(origins = ?config.allowed_origins, "CORS origins");

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

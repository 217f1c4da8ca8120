//! Application wiring and lifecycle.
//!
//! 1. **Startup**: load the catalog, connect the ledger, start metrics
//! 2. **Runtime**: serve HTTP until a shutdown signal arrives
//! 3. **Shutdown**: stop accepting connections, give in-flight requests
//!    `SHUTDOWN_TIMEOUT` to finish, then exit

use crate::catalog::{CatalogError, JsonFileCatalog};
use crate::config::{Config, LedgerBackend, NotifierConfig};
use crate::notifier::{ConsoleNotifier, SmtpNotifier, SmtpSetupError};
use signup_ledger_core::ledger::{LedgerError, LedgerStore};
use signup_ledger_core::notification::Notifier;
use signup_ledger_postgres::PostgresLedgerStore;
use signup_ledger_runtime::metrics::{MetricsError, MetricsServer};
use signup_ledger_runtime::RegistrationService;
use signup_ledger_testing::InMemoryLedgerStore;
use signup_ledger_web::{build_router, AppState};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

/// Errors that abort startup or the server loop.
#[derive(Error, Debug)]
pub enum StartupError {
    /// The event catalog could not be loaded.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The ledger could not be reached or migrated.
    #[error("Ledger setup failed: {0}")]
    Ledger(#[from] LedgerError),

    /// The SMTP notifier could not be configured.
    #[error("Notifier setup failed: {0}")]
    Notifier(#[from] SmtpSetupError),

    /// The metrics exporter could not be installed.
    #[error(transparent)]
    Metrics(#[from] MetricsError),

    /// Binding or serving failed.
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),

    /// The server task panicked or was cancelled.
    #[error("Server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Build the registration service described by `config`.
///
/// Connects to and migrates `PostgreSQL` when that backend is selected.
///
/// # Errors
///
/// Returns [`StartupError`] if the catalog, the notifier or the ledger
/// cannot be set up.
pub async fn build_service(config: &Config) -> Result<RegistrationService, StartupError> {
    let catalog = JsonFileCatalog::load(&config.catalog_path)?;

    let notifier: Arc<dyn Notifier> = match &config.notifier {
        NotifierConfig::Console => Arc::new(ConsoleNotifier::new()),
        NotifierConfig::Smtp(smtp) => {
            let notifier = SmtpNotifier::new(smtp)?;
            info!(host = %smtp.host, port = smtp.port, "SMTP notifier ready");
            Arc::new(notifier)
        }
    };

    let ledger: Arc<dyn LedgerStore> = match config.ledger.backend {
        LedgerBackend::Postgres => {
            let store =
                PostgresLedgerStore::connect(&config.ledger.database_url, &config.ledger.pool)
                    .await?;
            store.migrate().await?;
            info!(max_connections = config.ledger.pool.max_connections, "PostgreSQL ledger ready");
            Arc::new(store)
        }
        LedgerBackend::Memory => {
            warn!("Using in-memory ledger; registrations are lost on restart");
            Arc::new(InMemoryLedgerStore::new())
        }
    };

    Ok(RegistrationService::new(ledger, Arc::new(catalog), notifier)
        .with_config(config.service.clone()))
}

/// Run the server until a shutdown signal is received.
///
/// # Errors
///
/// Returns [`StartupError`] if setup fails or the listener errors.
pub async fn run(config: Config) -> Result<(), StartupError> {
    let mut metrics = MetricsServer::new(config.server.metrics_addr);
    metrics.start()?;
    info!(address = %config.server.metrics_addr, "Metrics exporter listening");

    let service = build_service(&config).await?;
    let router = build_router(AppState::new(Arc::new(service)));

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr).await?;
    info!(address = %config.server.bind_addr, "HTTP server listening");

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let mut server = tokio::spawn(
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                let _ = stop_tx.send(true);
            })
            .into_future(),
    );

    let grace = config.server.shutdown_timeout;
    tokio::select! {
        joined = &mut server => {
            joined??;
        }
        () = async {
            let _ = stop_rx.wait_for(|stopping| *stopping).await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(timeout_secs = grace.as_secs(), "Shutdown timed out, aborting in-flight requests");
            server.abort();
        }
    }

    info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            warn!(%error, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                warn!(%error, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}

//! NimbusData - an HTTP data gateway over relational stores.

mod cli;

use cli::Cli;
use nimbusdata::config::ConnectionDescriptor;
use nimbusdata::db::SqlxConnector;
use nimbusdata::error::{NimbusError, Result};
use nimbusdata::logging;
use nimbusdata::server::{create_router, AppState};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // A missing .env file is not an error
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();

    match cli.log_file.as_deref() {
        Some(path) => logging::init_file_logging(path),
        None => logging::init_stderr_logging(),
    }

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let descriptor = ConnectionDescriptor::from_env();
    if descriptor.driver().is_none() {
        warn!("No database driver configured; database routes will fail until one is set");
    } else {
        info!("Connection: {}", descriptor.display_string());
    }

    let state = AppState::new(descriptor, Arc::new(SqlxConnector::new()));
    let app = create_router(state);

    let addr = cli.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| NimbusError::config(format!("Cannot bind {addr}: {e}")))?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| NimbusError::unexpected(format!("Server error: {e}")))?;

    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}

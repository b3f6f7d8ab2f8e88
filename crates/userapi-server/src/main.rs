//! # UserAPI Server
//!
//! Resolves configuration, opens the data access layer, runs the startup
//! migration and holds the pool until a shutdown signal arrives.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use userapi_core::telemetry::init_logging;
use userapi_core::UserApiError;
use userapi_dal::Dal;
use userapi_server::{cli::Cli, startup};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        let code = e
            .downcast_ref::<UserApiError>()
            .map_or("UNKNOWN", UserApiError::error_code);
        error!(code, "Application error: {:#}", e);
        eprintln!("userapi: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.loader().load().context("Failed to load configuration")?;

    init_logging(&config.logging).context("Failed to initialise logging")?;

    info!("Starting UserAPI...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    startup::print_startup_info(&config);

    let dal = Arc::new(Dal::from_config(&config.database)?);

    dal.connect()
        .await
        .with_context(|| format!("Failed to connect to {}", dal.backend()))?;

    if let Err(e) = dal.migrate().await {
        // Nothing can be served without the schema; release the pool first.
        if let Err(close_err) = dal.close().await {
            warn!("Close after failed migration also failed: {}", close_err);
        }
        return Err(e).context("Startup migration failed");
    }

    info!("UserAPI ready on {}", dal.backend());
    shutdown_signal().await;

    dal.close().await?;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use feeds_mgmt::api::{self, AppState};
use feeds_mgmt::config::{Backend, Config};
use feeds_mgmt::logging::configure_logging;
use feeds_mgmt::storage::{Database, FeedRepository, InMemoryRepository};

#[derive(Parser, Debug)]
#[command(
    name = "feeds-mgmt",
    about = "HTTP service managing the RSS feed subscriptions of the news app"
)]
struct Args {
    /// TOML configuration file (environment variables override it)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// Resolve when the process receives Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, report) =
        Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    configure_logging(config.log_level(), config.options.dev_mode);
    report.log();

    tracing::info!(
        dev_mode = config.options.dev_mode,
        backend = ?config.database.backend,
        "APP starting"
    );

    // Keep the concrete handle so the pool can be closed after shutdown
    let mut database = None;
    let repo: Arc<dyn FeedRepository> = match config.database.backend {
        Backend::Sqlite => {
            let db = Database::open(
                &config.database.path,
                config.database.max_connections,
                config.database.busy_timeout(),
            )
            .await
            .with_context(|| format!("Failed to open database '{}'", config.database.path))?;
            database = Some(db.clone());
            Arc::new(db)
        }
        Backend::Memory => Arc::new(InMemoryRepository::new()),
    };

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    api::serve(listener, AppState::new(repo), shutdown_signal())
        .await
        .context("HTTP server failed")?;

    if let Some(db) = database {
        db.close().await;
    }

    tracing::info!("APP stopped");
    Ok(())
}

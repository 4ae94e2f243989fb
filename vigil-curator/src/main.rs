//! vigil-curator - Main entry point
//!
//! Serves the review API over the alert directory written by vigil-guard,
//! applies reviewer decisions, and runs the refresh scheduler that notifies
//! SSE clients when the alert directory changes.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vigil_common::config::{config_file_path, RootFolderResolver, TomlConfig};
use vigil_common::events::EventBus;
use vigil_common::DataLayout;
use vigil_curator::refresh::RefreshScheduler;
use vigil_curator::{build_router, AppState, HistoryLog, ProcessLocalHistory};

/// Command-line arguments for vigil-curator
#[derive(Parser, Debug)]
#[command(name = "vigil-curator")]
#[command(about = "Alert review and training dataset curation service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "VIGIL_CURATOR_PORT")]
    port: Option<u16>,

    /// Data root holding alerts/ and training_data/
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Path to config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds between alert directory polls (overrides config file)
    #[arg(long, env = "VIGIL_POLL_INTERVAL")]
    poll_interval: Option<f64>,

    /// Append decisions to curation_history.jsonl and replay it at startup
    #[arg(long, env = "VIGIL_PERSIST_HISTORY")]
    persist_history: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = config_file_path(args.config.as_deref());
    let mut config = TomlConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("vigil_curator={0},vigil_common={0},tower_http=info", config.logging.level)
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting vigil-curator v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file, using compiled defaults"),
    }

    let root_folder = RootFolderResolver::new(args.root_folder, &config).resolve();
    info!("Root folder: {}", root_folder.display());

    let layout = DataLayout::new(root_folder);
    layout
        .ensure_directories()
        .context("Failed to create data directories")?;

    let persist_history = args.persist_history || config.curation.persist_history;
    let history = if persist_history {
        let log = HistoryLog::new(layout.history_log_path());
        ProcessLocalHistory::with_log(log)
            .await
            .context("Failed to replay decision history")?
    } else {
        info!("Decision history is process-local; decided alerts report ARCHIVED after restart");
        ProcessLocalHistory::new()
    };

    if let Some(secs) = args.poll_interval {
        config.curation.poll_interval_secs = secs;
    }
    let poll_interval = config
        .curation
        .poll_interval()
        .context("Invalid poll interval")?;

    let event_bus = EventBus::new(100);
    let state = AppState::new(layout.clone(), history, event_bus.clone());

    // Refresh scheduler runs until shutdown
    let cancel = CancellationToken::new();
    let scheduler = RefreshScheduler::new(layout.alerts_dir(), poll_interval);
    let scheduler_handle = tokio::spawn(scheduler.run(event_bus, cancel.clone()));

    let app = build_router(state);

    let port = args.port.unwrap_or(config.curation.port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    cancel.cancel();
    let _ = scheduler_handle.await;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

//! vigil-guard - Main entry point
//!
//! Accepts frames from the inference process and writes debounced alert
//! triple-sets into the alert directory.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vigil_common::config::{config_file_path, RootFolderResolver, TomlConfig};
use vigil_common::DataLayout;
use vigil_guard::{build_router, AppState, DetectionProducer, ProducerConfig};

/// Command-line arguments for vigil-guard
#[derive(Parser, Debug)]
#[command(name = "vigil-guard")]
#[command(about = "Detection producer writing alert triple-sets")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "VIGIL_GUARD_PORT")]
    port: Option<u16>,

    /// Data root holding alerts/ and training_data/
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Path to config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Minimum detection confidence, 0.0 to 1.0
    #[arg(long, env = "VIGIL_CONFIDENCE_THRESHOLD")]
    confidence_threshold: Option<f32>,

    /// Seconds that must pass between two alerts
    #[arg(long, env = "VIGIL_COOLDOWN")]
    cooldown: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = config_file_path(args.config.as_deref());
    let mut config =
        TomlConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("vigil_guard={0},vigil_common={0},tower_http=info", config.logging.level)
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting vigil-guard v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if let Some(threshold) = args.confidence_threshold {
        config.guard.confidence_threshold = threshold;
    }
    if let Some(cooldown) = args.cooldown {
        config.guard.cooldown_secs = cooldown;
    }
    config.validate().context("Invalid configuration")?;

    let root_folder = RootFolderResolver::new(args.root_folder, &config).resolve();
    info!("Root folder: {}", root_folder.display());

    let layout = DataLayout::new(root_folder);
    layout
        .ensure_directories()
        .context("Failed to create data directories")?;

    let producer_config =
        ProducerConfig::try_from(&config.guard).context("Invalid guard configuration")?;
    info!(
        "Confidence threshold {:.2}, cooldown {:?}",
        producer_config.confidence_threshold, producer_config.cooldown
    );

    let producer = DetectionProducer::new(producer_config, layout.alerts_dir());
    let app = build_router(AppState::new(producer));

    let port = args.port.unwrap_or(config.guard.port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

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

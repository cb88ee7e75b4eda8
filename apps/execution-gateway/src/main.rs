//! Execution Gateway Binary
//!
//! Starts the Cream execution gateway.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin execution-gateway
//! ```
//!
//! # Environment Variables
//!
//! - `GATEWAY_CONFIG`: Path to the YAML config (default: config.yaml, built-in defaults if absent)
//! - `RUST_LOG`: Log filter (default: `observability.logging.level`)
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use execution_gateway::config::{Config, load_config};
use execution_gateway::infrastructure::config::Container;
use execution_gateway::observability::{MetricsConfig, init_metrics};
use execution_gateway::telemetry::init_telemetry;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Default configuration path.
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Grace period for in-flight messages after the sockets stop.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_ancestors();

    let config = read_config()?;
    let _telemetry = init_telemetry(&config.observability.logging.level);

    tracing::info!(
        server_id = %config.server.server_id,
        commands_port = config.server.commands_port,
        events_port = config.server.events_port,
        compression = ?config.wire.compression,
        serializer = ?config.wire.serializer,
        encryption = config.wire.encryption.enabled,
        "Starting Cream Execution Gateway"
    );

    if config.observability.metrics.enabled {
        let listen_addr = config
            .observability
            .metrics
            .listen_addr
            .parse::<std::net::SocketAddr>()
            .context("invalid metrics listen address")?;
        init_metrics(&MetricsConfig::with_addr(listen_addr))
            .context("failed to start metrics exporter")?;
    }

    let container = Container::start(&config)
        .await
        .context("failed to start execution gateway")?;

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    tracing::info!("Execution gateway ready");
    shutdown.cancelled().await;

    container.stop();
    tokio::time::sleep(SHUTDOWN_GRACE).await;

    tracing::info!("Execution gateway exited");
    Ok(())
}

/// Read configuration from `GATEWAY_CONFIG` or the default path.
fn read_config() -> anyhow::Result<Config> {
    match std::env::var("GATEWAY_CONFIG") {
        Ok(path) => load_config(Some(&path)).with_context(|| format!("loading {path}")),
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            load_config(Some(DEFAULT_CONFIG_PATH)).context("loading config.yaml")
        }
        Err(_) => {
            eprintln!("No {DEFAULT_CONFIG_PATH} found, using built-in defaults");
            Ok(Config::default())
        }
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv_from_ancestors() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for SIGTERM or SIGINT, then cancel `shutdown`.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown.cancel();
}

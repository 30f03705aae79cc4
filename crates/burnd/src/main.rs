//! burnd: burnnote secret exchange service
//!
//! Usage:
//!   burnd [--config /etc/burnnote/config.toml] [--listen 0.0.0.0:4000]
//!
//! Endpoints:
//!   POST /api/note        store an encrypted envelope, returns its id
//!   GET  /api/note/{id}   hand out the envelope once, then forget it
//!   GET  /api/health      service status
//!   GET  /healthz /readyz liveness / readiness
//!   GET  /metrics         Prometheus text format

mod api;
mod daemon;
mod metrics;

use anyhow::Result;
use burn_core::config::BurnConfig;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "burnd", version, about = "burnnote secret exchange service")]
struct Cli {
    /// Path to config.toml
    #[arg(
        long,
        short = 'c',
        env = "BURN_CONFIG",
        default_value = "/etc/burnnote/config.toml"
    )]
    config: PathBuf,

    /// Listen address (overrides server.listen)
    #[arg(long, env = "BURN_LISTEN")]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides server.log_level
    #[arg(long, env = "BURN_LOG")]
    log: Option<String>,

    /// Log format; overrides server.log_format
    #[arg(long, env = "BURN_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, found) = load_config(&cli.config).await?;
    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }

    let level = cli.log.unwrap_or_else(|| config.server.log_level.clone());
    let format = cli.log_format.unwrap_or(match config.server.log_format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, &format);

    if !found {
        tracing::warn!(
            "config file not found: {}  (using defaults)",
            cli.config.display()
        );
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        backend = ?config.store.backend,
        "burnd starting"
    );

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", cli.config.display()))?;

    daemon::run(config).await
}

/// Returns the parsed config and whether the file existed.
async fn load_config(path: &Path) -> Result<(BurnConfig, bool)> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("reading config {}: {e}", path.display()))?;
        let config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("parsing config {}: {e}", path.display()))?;
        Ok((config, true))
    } else {
        Ok((BurnConfig::default(), false))
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
        }
    }
}

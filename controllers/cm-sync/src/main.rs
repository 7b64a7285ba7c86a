//! ConfigMap Sync Controller
//!
//! Watches Kubernetes ConfigMaps and mirrors those matching configured label
//! selectors onto the local filesystem, one file per data entry. Entries can
//! be gated by user-defined verification commands, and post-deploy commands
//! run after each successful sync so consumers (Prometheus & friends) can
//! pick up the new files.

mod actions;
mod config;
mod controller;
mod error;
mod exec;
mod reconciler;
mod selector;
#[cfg(test)]
mod test_utils;
mod verify;
mod watcher;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::controller::Controller;
use crate::error::ControllerError;

/// Collects and prepares files from Kubernetes ConfigMaps for Prometheus & friends.
#[derive(Debug, Parser)]
#[command(name = "cm-sync", version, about)]
struct Cli {
    /// YAML configuration file
    #[arg(long = "config")]
    config: PathBuf,

    /// Optional kubectl configuration file. If undefined the in-cluster
    /// environment (or the default kubeconfig chain) is used
    #[arg(long = "kubeconfig")]
    kubeconfig: Option<PathBuf>,

    /// Log level
    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Enable JSON-formatted logging on stdout
    #[arg(long = "log-json")]
    log_json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

fn init_tracing(level: LogLevel, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    let cli = Cli::parse();
    init_tracing(cli.log_level, cli.log_json);

    info!("Starting ConfigMap sync controller");

    let config = config::load(&cli.config)?;
    debug!("Successfully loaded configuration: {:?}", config);

    let controller = Controller::new(config, cli.kubeconfig.as_deref()).await?;
    controller.run().await?;

    Ok(())
}

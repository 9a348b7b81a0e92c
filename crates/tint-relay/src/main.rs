//! # tint-relay
//!
//! Relay server binary: resolves settings, installs logging and metrics,
//! and runs the HTTP/WebSocket server until Ctrl-C or SIGTERM.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tint_server::config::ServerConfig;
use tint_server::server::TintServer;
use tint_settings::{IgnoredOverride, TintSettings};
use tracing::{error, info, warn};

/// Smoothed color relay server.
#[derive(Parser, Debug)]
#[command(name = "tint-relay", about = "Smoothed color relay server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings and `PORT`).
    #[arg(long)]
    port: Option<u16>,

    /// Directory of static assets (overrides settings).
    #[arg(long)]
    public_dir: Option<PathBuf>,

    /// Settings file (default `~/.tint/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl Cli {
    /// Resolve settings from file and environment, then apply flags.
    ///
    /// Also returns the env overrides that failed to parse, for logging
    /// once the subscriber is up.
    fn resolve_settings(&self) -> Result<(TintSettings, Vec<IgnoredOverride>)> {
        let path = self
            .settings
            .clone()
            .unwrap_or_else(tint_settings::settings_path);
        let (mut settings, ignored) = tint_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        self.apply(&mut settings);
        Ok((settings, ignored))
    }

    fn apply(&self, settings: &mut TintSettings) {
        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(ref dir) = self.public_dir {
            settings.server.public_dir = dir.to_string_lossy().into_owned();
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = format!("{e:#}"), "tint relay failed");
            eprintln!("tint-relay: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Cli) -> Result<()> {
    let (settings, ignored) = args.resolve_settings()?;
    tint_core::logging::init_subscriber(&settings.logging.level);
    log_ignored(&ignored);

    let config = ServerConfig::from_settings(&settings).context("Invalid settings")?;
    let metrics_handle =
        tint_server::metrics::install_recorder().context("Failed to install metrics recorder")?;

    let server = TintServer::new(config, metrics_handle);
    let (addr, serve_handle) = server
        .listen()
        .await
        .with_context(|| format!("Failed to bind {}", server.config().bind_addr()))?;
    info!(%addr, public_dir = %server.config().public_dir.display(), "server ready");

    tint_server::shutdown::shutdown_signal().await;
    info!("shutting down");
    server.shutdown().await;
    server
        .shutdown_coordinator()
        .graceful_shutdown(vec![serve_handle], None)
        .await;
    Ok(())
}

fn log_ignored(ignored: &[IgnoredOverride]) {
    for o in ignored {
        warn!(key = o.key, value = %o.value, "invalid env var, ignoring");
    }
}

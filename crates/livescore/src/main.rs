//! # livescore
//!
//! Live football score server binary: loads settings, starts the
//! HTTP/WebSocket server and the match simulator.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use livescore_core::Scoreboard;
use livescore_server::feed::Simulator;
use livescore_server::{ScoreboardServer, ServerConfig};
use livescore_settings::LivescoreSettings;

/// Live football score broadcast server.
#[derive(Parser, Debug)]
#[command(name = "livescore", about = "Live football score broadcast server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (defaults to `~/.livescore/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not run the built-in match simulator.
    #[arg(long)]
    no_simulator: bool,
}

impl Cli {
    /// Apply flags on top of loaded settings.
    fn apply(&self, settings: &mut LivescoreSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if self.no_simulator {
            settings.simulator.enabled = false;
        }
    }
}

/// Defaults, then the settings file, then `LIVESCORE_*` env vars, then flags.
fn load_settings(cli: &Cli) -> Result<LivescoreSettings> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(livescore_settings::settings_path);
    let mut settings = livescore_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    cli.apply(&mut settings);
    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    livescore_logging::init_subscriber(&settings.logging)
        .context("Failed to initialize logging")?;

    let metrics = match livescore_server::metrics::install_recorder() {
        Ok(handle) => Some(handle),
        Err(err) => {
            tracing::warn!(error = %err, "metrics recorder unavailable, /metrics disabled");
            None
        }
    };

    let config = ServerConfig::from(&settings.server);
    let server = ScoreboardServer::new(config, Scoreboard::seeded(Utc::now()), metrics);
    let (addr, server_task) = server.listen().await.context("Failed to bind server")?;
    tracing::info!(%addr, games = server.feed().game_count(), "livescore ready");

    let mut tasks = vec![server_task];
    tasks.extend(server.take_background_tasks());

    if settings.simulator.enabled {
        let simulator = Simulator::new(
            server.feed().clone(),
            Duration::from_millis(settings.simulator.tick_interval_ms),
            settings.simulator.max_home_goals,
        );
        tasks.push(simulator.spawn(server.shutdown().token()));
    } else {
        tracing::info!("simulator disabled");
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    let _ = server.shutdown().graceful_shutdown(tasks, None).await;
    Ok(())
}

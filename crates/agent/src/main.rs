// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! swarmload-agentd: the agent process entry point.
//!
//! Loads [`AgentConfig`], sets up logging, wires `SIGINT`/`SIGTERM` to the
//! control loop's `shutdown()`, and drives [`AgentControlLoop::run`] to
//! completion.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;

use clap::Parser;
use swarmload_agent::config::AgentConfig;
use swarmload_agent::control_loop::AgentControlLoop;
use swarmload_core::SystemClock;
use tracing::{error, info};

/// The swarmload load-generation agent.
#[derive(Debug, Parser)]
#[command(name = "swarmload-agentd", version, about, long_about = None)]
struct Cli {
    /// Home directory everything else is resolved under. Defaults to
    /// `SWARMLOAD_HOME`, or `~/.swarmload` if unset.
    #[arg(long)]
    home: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.home {
        Some(home) => AgentConfig::load_from(home.clone())?,
        None => AgentConfig::load()?,
    };

    let _log_guard = setup_logging(&config)?;
    info!(home_dir = %config.home_dir.display(), "starting swarmload agent");

    let control_loop = Arc::new(AgentControlLoop::new(config, SystemClock));

    spawn_signal_handlers(control_loop.clone());

    let result = control_loop.run().await;
    match &result {
        Ok(()) => info!("agent terminated"),
        Err(err) => error!(error = %err, "agent terminated with error"),
    }
    result.map_err(Into::into)
}

/// Wire `SIGINT`/`SIGTERM` to [`AgentControlLoop::shutdown`] (§5, §10.5).
/// Each signal is handled on its own task; either one firing triggers the
/// same idempotent shutdown path.
fn spawn_signal_handlers(control_loop: Arc<AgentControlLoop>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let sigterm_loop = control_loop.clone();
        tokio::spawn(async move {
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                info!("received SIGTERM, shutting down");
                sigterm_loop.shutdown();
            }
        });

        tokio::spawn(async move {
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                info!("received SIGINT, shutting down");
                control_loop.shutdown();
            }
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received ctrl-c, shutting down");
                control_loop.shutdown();
            }
        });
    }
}

/// Set up a non-blocking `tracing-subscriber` file sink under
/// `config.log_root`, filtered by `RUST_LOG` (default `info`), matching
/// every other binary entry point in the workspace.
fn setup_logging(
    config: &AgentConfig,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    std::fs::create_dir_all(&config.log_root)?;

    let file_appender = tracing_appender::rolling::never(&config.log_root, "agent.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

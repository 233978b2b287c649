//! `casper` - chat-bot session runtime.
//!
//! Loads configuration, starts the status page, and keeps one messaging
//! session alive through the bridge until SIGINT or SIGTERM.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use casper_bridge::BridgeClient;
use casper_config::Config;
use casper_session::SessionManager;
use casper_status::StatusState;
use casper_storage::{CredentialStore, FileCredentialStore};
use clap::Parser;
use tokio::sync::{broadcast, oneshot};
use tracing::{error, info, warn};

mod config_bridge;
mod signal;
mod theme;
mod watch;

use theme::{Tone, print_banner, say};

/// Casper - chat-bot session runtime
#[derive(Parser)]
#[command(name = "casper")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a configuration file (default: ./casper.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Status page port, overrides the config file and PORT
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Delete stored credentials before starting, forcing a new pairing
    #[arg(long)]
    reset_credentials: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        Config::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(port) = args.port {
        config.http.port = port;
    }

    let log_config = config_bridge::log_config(&config.log, args.verbose);
    if let Err(e) = casper_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    print_banner(&config.bot.name);
    let started_at = Instant::now();

    // Credentials.
    let store = Arc::new(FileCredentialStore::new(&config.session.auth_dir));
    if args.reset_credentials {
        let removed = store
            .clear()
            .await
            .context("failed to clear stored credentials")?;
        let note = if removed {
            "Stored credentials removed"
        } else {
            "No stored credentials to remove"
        };
        say(Tone::Ok, note);
    }

    // Session.
    let client = Arc::new(BridgeClient::new(config_bridge::bridge_config(&config)));
    let manager = SessionManager::new(config_bridge::session_config(&config), client, store)
        .with_started_at(started_at);
    let handle = manager.handle();

    // Status page.
    let addr = config.http.listen_addr();
    let listener = casper_status::bind(&addr).await?;
    say(Tone::Note, &format!("Status page on http://{addr}"));
    let (http_stop_tx, http_stop_rx) = oneshot::channel::<()>();
    let status_state = StatusState::new(handle.clone(), started_at, config.bot.name.clone());
    let stop_http = async move {
        let _ = http_stop_rx.await;
    };
    let mut server_task =
        tokio::spawn(casper_status::serve(listener, status_state, stop_http));

    let watch_task = tokio::spawn(watch::watch_session(handle));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let mut manager_task = tokio::spawn(manager.run(shutdown_tx.subscribe()));

    let mut manager_done = false;
    let mut server_done = false;
    tokio::select! {
        name = signal::shutdown_signal() => {
            info!(signal = name, "Shutdown requested");
        },
        res = &mut manager_task => {
            manager_done = true;
            if let Err(e) = res {
                error!(error = %e, "Session manager task failed");
            } else {
                warn!("Session manager stopped");
            }
        },
        res = &mut server_task => {
            server_done = true;
            match res {
                Ok(Ok(())) => warn!("Status server stopped"),
                Ok(Err(e)) => error!(error = %e, "Status server failed"),
                Err(e) => error!(error = %e, "Status server task failed"),
            }
        },
    }

    println!();
    say(Tone::Warn, "Shutting down...");

    // Session first so the bridge sees a clean close, then the page.
    let _ = shutdown_tx.send(());
    if !manager_done && let Err(e) = manager_task.await {
        error!(error = %e, "Session manager task failed");
    }
    watch_task.abort();

    let _ = http_stop_tx.send(());
    if !server_done {
        match server_task.await {
            Ok(Ok(())) => {},
            Ok(Err(e)) => error!(error = %e, "Status server failed"),
            Err(e) => error!(error = %e, "Status server task failed"),
        }
    }

    say(Tone::Ok, "Stopped");
    Ok(())
}

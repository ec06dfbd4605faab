//! # webterm
//!
//! Attach the local terminal to a remote PTY session.
//!
//! ## Overview
//!
//! The client:
//! - Opens the session's WebSocket and reconnects with backoff when it drops
//! - Keeps the remote PTY sized to the local terminal
//! - Saves files the remote side offers for download
//!
//! ## Architecture
//!
//! This is Layer 2 - the binary that ties together:
//! - webterm-core: Wire format, configuration and backoff policy
//! - webterm-transport: Connection state machine and tokio runtime

mod args;
mod tty;

use std::io::Write;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use url::Url;

use webterm_core::{ClientConfig, Endpoint};
use webterm_transport::{Notice, TransportOptions, TransportRuntime};

use crate::args::Args;
use crate::tty::{spawn_stdin_reader, CrlfWriter, RawMode, TtySurface};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_config(&args)?;

    // Logs go to stderr so they stay out of the rendered terminal. Raw mode
    // turns off newline translation, so the writer adds the carriage return.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(|| CrlfWriter::new(std::io::stderr()))
        .init();

    let endpoint = Endpoint::for_session(&config.server.base_url, &args.session_id)
        .with_context(|| format!("invalid server URL '{}'", config.server.base_url))?;
    tracing::info!(
        "webterm v{} attaching to {}",
        env!("CARGO_PKG_VERSION"),
        endpoint
    );

    let mut runtime = TransportRuntime::new(endpoint, TransportOptions::from(&config))
        .with_download_directory(config.download.directory.clone());
    if let Some(origin) = &config.server.download_origin {
        let origin = Url::parse(origin)
            .with_context(|| format!("invalid server.download_origin '{origin}'"))?;
        runtime = runtime.with_download_origin(origin);
    }

    let raw_mode = RawMode::enable().context("cannot put the terminal in raw mode")?;

    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel();
    let (handle, mut task) = runtime.spawn(Box::new(TtySurface::new()), Box::new(notice_tx));
    spawn_stdin_reader(handle.clone());

    let mut window_changes =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::window_change())
            .context("cannot listen for terminal resizes")?;

    let mut failed = None;
    let mut finished = false;
    loop {
        tokio::select! {
            _ = window_changes.recv() => handle.surface_changed(),
            notice = notice_rx.recv() => match notice {
                Some(notice) => {
                    show_notice(&notice);
                    if let Notice::Failed { attempts } = notice {
                        failed = Some(attempts);
                        break;
                    }
                }
                None => break,
            },
            result = &mut task => {
                finished = true;
                result.context("transport task panicked")?;
                break;
            }
        }
    }

    if !finished {
        handle.shutdown();
        task.await.context("transport task panicked")?;
    }
    drop(raw_mode);
    tracing::info!("webterm detached");

    match failed {
        Some(attempts) => anyhow::bail!("connection failed after {attempts} attempts"),
        None => Ok(()),
    }
}

fn load_config(args: &Args) -> anyhow::Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(server) = &args.server {
        config.server.base_url = server.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Print a notice on its own line, in the manner of a status line.
fn show_notice(notice: &Notice) {
    let colour = match notice {
        Notice::Reconnected => "32",
        Notice::Failed { .. } => "31",
        _ => "33",
    };
    let mut stderr = std::io::stderr().lock();
    let _ = write!(stderr, "\r\n\x1b[{colour}m[webterm] {notice}\x1b[0m\r\n");
    let _ = stderr.flush();
}

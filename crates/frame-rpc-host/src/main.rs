//! frame-rpc-host: serve embedded-frame RPC requests over stdio.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing::info;

use frame_rpc_host::telemetry;
use frame_rpc_host::HostConfig;

/// Host-side RPC server for embedded frames
#[derive(Parser, Debug)]
#[command(name = "frame-rpc-host")]
#[command(about = "Serve requestConfig/requestGroups to embedded frames over line-delimited JSON")]
#[command(version)]
struct Args {
    /// TOML config file ([server], [transport], [logging], [client])
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON array settling requestGroups once loaded
    #[arg(short, long)]
    groups: Option<PathBuf>,

    /// Log filter, overrides both RUST_LOG and [logging].level
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => HostConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => HostConfig::default(),
    };

    telemetry::init_tracing(&config.logging, args.log_level.as_deref())
        .context("Failed to initialize logging")?;
    info!(
        version = frame_rpc::VERSION,
        allowed_origins = ?config.server.allowed_origins,
        "Starting frame RPC host"
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    frame_rpc_host::serve(
        config,
        args.groups,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        shutdown,
    )
    .await
}

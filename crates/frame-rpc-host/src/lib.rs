//! Frame RPC host bridge.
//!
//! Runs the frame RPC server for a host page whose browser side forwards
//! message events over stdio. Stdin carries inbound events, stdout carries
//! outbound posts, stderr carries logs.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod methods;
pub mod stdio;
pub mod telemetry;

use anyhow::{Context, Result};
use frame_rpc::RpcServer;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub use config::{HostConfig, HostConfigError, LoggingConfig, TransportConfig};

/// How long queued responses get to reach the writer after the listener stops
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Serve requests from `reader` until it closes or `shutdown` completes.
///
/// When `groups` is set, the groups document is loaded in the background and
/// settles `requestGroups`; otherwise those requests stay pending.
pub async fn serve<R, W, F>(
    config: HostConfig,
    groups: Option<PathBuf>,
    reader: R,
    writer: W,
    shutdown: F,
) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
    F: Future<Output = ()>,
{
    let server = RpcServer::new(config.server.clone())
        .context("Invalid server configuration")?;
    let settler = methods::install(&server, config.client_value())
        .context("Failed to register host methods")?;

    // Held until exit so requests wait rather than fail.
    let pending_groups = match groups {
        Some(path) => {
            tokio::spawn(methods::settle_groups(settler, path));
            None
        }
        None => {
            info!("No groups file given, requestGroups stays pending");
            Some(settler)
        }
    };

    let transport = &config.transport;
    let (outbound_tx, outbound_rx) = mpsc::channel(transport.outbound_buffer);
    let writer_task = stdio::spawn_writer(writer, outbound_rx);
    let source = stdio::LineSource::new(reader, outbound_tx, transport.max_line_length);

    let mut listener = server.listen(source);
    let stopped = tokio::select! {
        result = listener.join() => Some(result),
        _ = shutdown => None,
    };

    match stopped {
        Some(result) => result.context("Listener failed")?,
        None => {
            info!("Shutdown requested");
            listener.shutdown();
            listener.join().await.context("Listener failed")?;
        }
    }

    info!(metrics = ?server.metrics(), "Frame RPC host stopped");
    drop(server);
    drop(pending_groups);

    match tokio::time::timeout(DRAIN_TIMEOUT, writer_task).await {
        Ok(Ok(result)) => result.context("Failed to write to stdout")?,
        Ok(Err(e)) => warn!(error = %e, "Writer task failed"),
        Err(_) => debug!("Responses still pending at exit, not waiting for them"),
    }

    Ok(())
}

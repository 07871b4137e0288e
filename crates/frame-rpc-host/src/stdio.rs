//! Line-delimited JSON transport over stdio.
//!
//! Each inbound line names the window that posted the message and the origin
//! the embedding page observed:
//!
//! ```text
//! {"window": "sidebar", "origin": "https://sidebar.example", "data": {...}}
//! ```
//!
//! Each outbound line names the destination window and the exact target
//! origin the browser side must enforce:
//!
//! ```text
//! {"window": "sidebar", "targetOrigin": "https://sidebar.example", "message": {...}}
//! ```
//!
//! Lines that are not valid UTF-8, not JSON, or longer than the configured
//! limit are skipped; only end of input or a read error ends the source.

use async_trait::async_trait;
use frame_rpc::ports::transport::check_target_origin;
use frame_rpc::{MessageEvent, MessageSource, PeerWindow, TransportError, WindowHandle};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Bytes discarded per read while skipping an oversized line
const SKIP_CHUNK: u64 = 8 * 1024;

const QUEUE_FULL: &str = "outbound queue full";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundLine {
    pub window: String,
    pub origin: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundLine {
    pub window: String,
    pub target_origin: String,
    pub message: Value,
}

/// A named window on the far side of stdout.
///
/// Posts go through a bounded queue; when stdout stalls and the queue is
/// full, posts fail instead of buffering without limit.
pub struct StdioWindow {
    name: String,
    outbound: mpsc::Sender<OutboundLine>,
}

impl PeerWindow for StdioWindow {
    fn post_message(&self, message: Value, target_origin: &str) -> Result<(), TransportError> {
        check_target_origin(target_origin)?;

        let line = OutboundLine {
            window: self.name.clone(),
            target_origin: target_origin.to_string(),
            message,
        };

        match self.outbound.try_send(line) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(TransportError::SendFailed(QUEUE_FULL.into())),
            Err(TrySendError::Closed(_)) => Err(TransportError::WindowClosed),
        }
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

enum RawLine {
    /// Line content without its terminator
    Complete(Vec<u8>),
    /// Discarded line and its length in bytes
    Oversized(usize),
}

/// Reads inbound lines and turns them into message events.
///
/// Window names map to one shared handle each, so two lines from the same
/// window name refer to the same peer. Partially read lines are kept across
/// calls, so a cancelled `next_event` loses nothing.
pub struct LineSource<R> {
    reader: R,
    buf: Vec<u8>,
    skipped: Option<usize>,
    max_line_length: usize,
    windows: HashMap<String, Arc<StdioWindow>>,
    outbound: mpsc::Sender<OutboundLine>,
}

impl<R> LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R, outbound: mpsc::Sender<OutboundLine>, limit: usize) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            skipped: None,
            max_line_length: limit.max(1),
            windows: HashMap::new(),
            outbound,
        }
    }

    fn window(&mut self, name: &str) -> WindowHandle {
        if let Some(window) = self.windows.get(name) {
            return Arc::clone(window) as WindowHandle;
        }

        let window = Arc::new(StdioWindow {
            name: name.to_string(),
            outbound: self.outbound.clone(),
        });
        self.windows.insert(name.to_string(), Arc::clone(&window));
        window
    }

    /// Next raw line, or `None` at end of input.
    async fn read_line(&mut self) -> io::Result<Option<RawLine>> {
        loop {
            if let Some(skipped) = self.skipped {
                self.buf.clear();
                let n = (&mut self.reader)
                    .take(SKIP_CHUNK)
                    .read_until(b'\n', &mut self.buf)
                    .await?;

                let total = skipped + n;
                let done = n == 0 || self.buf.last() == Some(&b'\n');
                self.buf.clear();
                if done {
                    self.skipped = None;
                    return Ok(Some(RawLine::Oversized(total)));
                }
                self.skipped = Some(total);
                continue;
            }

            if self.buf.len() > self.max_line_length {
                self.skipped = Some(self.buf.len());
                continue;
            }

            let room = (self.max_line_length + 1 - self.buf.len()) as u64;
            let n = (&mut self.reader)
                .take(room)
                .read_until(b'\n', &mut self.buf)
                .await?;

            if self.buf.last() == Some(&b'\n') {
                self.buf.pop();
                return Ok(Some(RawLine::Complete(std::mem::take(&mut self.buf))));
            }
            if n == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(RawLine::Complete(std::mem::take(&mut self.buf))));
            }
        }
    }
}

#[async_trait]
impl<R> MessageSource for LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_event(&mut self) -> Option<MessageEvent> {
        loop {
            let line = match self.read_line().await {
                Ok(Some(RawLine::Complete(line))) => line,
                Ok(Some(RawLine::Oversized(len))) => {
                    debug!(
                        len,
                        limit = self.max_line_length,
                        "Skipping oversized inbound line"
                    );
                    continue;
                }
                Ok(None) => return None,
                Err(e) => {
                    warn!(error = %e, "Failed to read inbound line");
                    return None;
                }
            };

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match serde_json::from_slice::<InboundLine>(&line) {
                Ok(inbound) => {
                    let source = self.window(&inbound.window);
                    return Some(MessageEvent::new(inbound.data, inbound.origin, source));
                }
                Err(e) => {
                    debug!(error = %e, "Skipping unparsable inbound line");
                }
            }
        }
    }
}

/// Drain outbound lines to `writer` until every sender is gone.
pub fn spawn_writer<W>(
    mut writer: W,
    mut outbound: mpsc::Receiver<OutboundLine>,
) -> JoinHandle<io::Result<()>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(line) = outbound.recv().await {
            let mut bytes = serde_json::to_vec(&line)?;
            bytes.push(b'\n');
            writer.write_all(&bytes).await?;
            writer.flush().await?;
        }
        Ok(())
    })
}

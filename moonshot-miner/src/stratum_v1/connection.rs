//! TCP connection management with line-delimited I/O.
//!
//! Stratum v1 uses newline-delimited JSON over TCP. This module provides a
//! wrapper around tokio's TCP stream that frames complete JSON-RPC messages
//! out of an append-only receive buffer and writes single-line replies. The
//! [`Transport`] trait abstracts message I/O, allowing channel-based mocks for
//! deterministic testing.
//!
//! Reads are cancellation-safe: bytes are accumulated in a buffer owned by the
//! connection rather than by the pending future, so the worker can race
//! `read_message` against its batch timer in `select!` without losing a
//! partially received line.

use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, trace};

use super::error::{StratumError, StratumResult};
use super::messages::JsonRpcMessage;

/// Largest frame accepted from the pool.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Message-level I/O for Stratum protocol.
///
/// Abstracts reading and writing JSON-RPC messages so the worker can
/// run over TCP (production) or channels (tests).
#[async_trait]
pub trait Transport: Send {
    /// Read one complete JSON-RPC message.
    ///
    /// Returns `None` on clean connection close (EOF). Must be cancel-safe.
    async fn read_message(&mut self) -> StratumResult<Option<JsonRpcMessage>>;

    /// Write a JSON-RPC message.
    async fn write_message(&mut self, msg: &JsonRpcMessage) -> StratumResult<()>;
}

/// Host and port of a pool, parsed from its URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolAddress {
    pub host: String,
    pub port: u16,
}

impl PoolAddress {
    /// Parse `stratum+tcp://host:port`, `tcp://host:port` or `host:port`.
    pub fn parse(url: &str) -> StratumResult<Self> {
        let rest = url
            .strip_prefix("stratum+tcp://")
            .or_else(|| url.strip_prefix("tcp://"))
            .unwrap_or(url);
        let rest = rest.trim_end_matches('/');

        if rest.contains("://") {
            return Err(StratumError::InvalidUrl(format!(
                "unsupported scheme: {}",
                url
            )));
        }

        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| StratumError::InvalidUrl(format!("missing port: {}", url)))?;
        if host.is_empty() {
            return Err(StratumError::InvalidUrl(format!("missing host: {}", url)));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| StratumError::InvalidUrl(format!("bad port: {}", url)))?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl std::fmt::Display for PoolAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Buffered TCP connection for Stratum protocol.
///
/// Incoming bytes accumulate in `rx_buf` until a newline completes a frame;
/// anything after the last newline stays buffered for the next read.
pub struct Connection {
    reader: OwnedReadHalf,

    /// Buffered writer for outgoing messages
    writer: BufWriter<OwnedWriteHalf>,

    /// Append-only receive buffer
    rx_buf: BytesMut,
}

impl Connection {
    /// Create a new connection from a TCP stream.
    pub fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();

        Self {
            reader: read_half,
            writer: BufWriter::new(write_half),
            rx_buf: BytesMut::with_capacity(4096),
        }
    }

    /// Connect to a Stratum pool.
    pub async fn connect(addr: &PoolAddress) -> StratumResult<Self> {
        debug!(pool = %addr, "Connecting to pool");

        let stream = TcpStream::connect((addr.host.as_str(), addr.port))
            .await
            .map_err(|e| StratumError::ConnectionFailed(e.to_string()))?;
        stream.set_nodelay(true)?;

        debug!(pool = %addr, "Connected to pool");

        Ok(Self::new(stream))
    }

    /// Pop the next complete line out of the receive buffer, if any.
    ///
    /// The returned line has its trailing `\n` and any `\r` removed.
    fn next_line(&mut self) -> Option<BytesMut> {
        let pos = self.rx_buf.iter().position(|&b| b == b'\n')?;
        let mut line = self.rx_buf.split_to(pos + 1);
        line.truncate(pos);
        if line.last() == Some(&b'\r') {
            line.truncate(pos - 1);
        }
        Some(line)
    }
}

#[async_trait]
impl Transport for Connection {
    async fn read_message(&mut self) -> StratumResult<Option<JsonRpcMessage>> {
        loop {
            while let Some(line) = self.next_line() {
                let line = String::from_utf8_lossy(line.chunk());
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                trace!(rx = %line, "Received message");

                let msg = serde_json::from_str(line).map_err(|e| {
                    StratumError::InvalidMessage(format!(
                        "Failed to parse JSON: {}, line: {}",
                        e, line
                    ))
                })?;
                return Ok(Some(msg));
            }

            if self.rx_buf.len() > MAX_LINE_LEN {
                return Err(StratumError::LineTooLong(MAX_LINE_LEN));
            }

            // read_buf only appends what it actually read, so dropping this
            // future between polls never loses bytes.
            let n = self.reader.read_buf(&mut self.rx_buf).await?;
            if n == 0 {
                if !self.rx_buf.is_empty() {
                    debug!(
                        bytes = self.rx_buf.len(),
                        "Connection closed with partial line buffered"
                    );
                }
                return Ok(None);
            }
        }
    }

    async fn write_message(&mut self, msg: &JsonRpcMessage) -> StratumResult<()> {
        let json = serde_json::to_string(msg)?;
        trace!(tx = %json, "Sending message");

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }
}

/// Channel-based transport for deterministic testing.
///
/// Backed by tokio mpsc channels rather than TCP, so it works with
/// `tokio::time::pause()` without triggering auto-advance on real I/O.
/// Create a pair with [`MockTransport::pair()`]; the transport is the
/// worker's side, the handle is the test's side. Dropping the handle reads
/// as EOF on the transport.
#[cfg(test)]
pub(crate) struct MockTransport {
    rx: tokio::sync::mpsc::UnboundedReceiver<JsonRpcMessage>,
    tx: tokio::sync::mpsc::UnboundedSender<JsonRpcMessage>,
}

/// Test-side handle for a [`MockTransport`].
#[cfg(test)]
pub(crate) struct MockTransportHandle {
    tx: tokio::sync::mpsc::UnboundedSender<JsonRpcMessage>,
    rx: tokio::sync::mpsc::UnboundedReceiver<JsonRpcMessage>,
}

#[cfg(test)]
impl MockTransport {
    /// Create a linked (transport, handle) pair.
    pub fn pair() -> (Self, MockTransportHandle) {
        let (worker_tx, handle_rx) = tokio::sync::mpsc::unbounded_channel();
        let (handle_tx, worker_rx) = tokio::sync::mpsc::unbounded_channel();

        let transport = MockTransport {
            rx: worker_rx,
            tx: worker_tx,
        };
        let handle = MockTransportHandle {
            tx: handle_tx,
            rx: handle_rx,
        };
        (transport, handle)
    }
}

#[cfg(test)]
#[async_trait]
impl Transport for MockTransport {
    async fn read_message(&mut self) -> StratumResult<Option<JsonRpcMessage>> {
        Ok(self.rx.recv().await)
    }

    async fn write_message(&mut self, msg: &JsonRpcMessage) -> StratumResult<()> {
        self.tx
            .send(msg.clone())
            .map_err(|_| StratumError::Disconnected)
    }
}

#[cfg(test)]
impl MockTransportHandle {
    /// Send a message to the worker.
    pub fn send(&self, msg: JsonRpcMessage) {
        self.tx.send(msg).expect("transport dropped");
    }

    /// Receive a message the worker wrote.
    pub async fn recv(&mut self) -> JsonRpcMessage {
        self.rx.recv().await.expect("transport dropped")
    }

    /// Receive a message if one is already queued.
    pub fn try_recv(&mut self) -> Option<JsonRpcMessage> {
        self.rx.try_recv().ok()
    }
}

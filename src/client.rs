//! Client role: outbound TCP connection with heartbeat liveness.
//!
//! The [`ClientBuilder`] registers handlers and dials once; connect failure is
//! fatal to the attempt. A connected [`Client`] runs the same frame loop as a
//! server connection, plus an idle timer owned by the connection task: after
//! [`DEFAULT_HEARTBEAT_INTERVAL`] without a received frame it sends exactly
//! one heartbeat ping, re-arming whenever a frame arrives. The timer dies with
//! the connection.
//!
//! Termination is reported out-of-band as a [`Disconnect`] value rather than
//! through dispatch.
//!
//! # Example
//!
//! ```ignore
//! use peerwire::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .handle(6, |req, _rsp| async move {
//!             println!("server says: {:?}", req.body());
//!             Ok(())
//!         })
//!         .connect("127.0.0.1:4000")
//!         .await?;
//!
//!     client.send_frame(5, b"hello").await?;
//!     let reason = client.wait_for_disconnect().await?;
//!     println!("connection ended: {reason:?}");
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::net::{tcp::OwnedReadHalf, TcpStream, ToSocketAddrs};
use tokio::sync::{oneshot, watch};
use tokio::time::Instant;

use crate::error::{PeerwireError, Result};
use crate::handler::{Handler, HandlerRegistry, Request, Responder};
use crate::protocol::{build_frame, heartbeat_frame, FrameBuffer, DEFAULT_MAX_FRAME_SIZE, MAX_BODY_SIZE};
use crate::server::READ_BUFFER_SIZE;
use crate::writer::{spawn_writer_task, WriterHandle};

/// Inactivity window after which the client sends a heartbeat ping.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Why a client connection ended.
///
/// Delivered through the completion channel once per connection. `Closed` and
/// `ReadError` correspond to the protocol's clean-termination and
/// error-termination codes (1 and 2); `Protocol` covers a local close after
/// the peer violated the frame size cap or sent a malformed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disconnect {
    /// The peer closed the stream (zero-length read).
    Closed,
    /// A socket read failed.
    ReadError,
    /// The peer violated the protocol and the connection was dropped.
    Protocol,
}

/// Builder for configuring and connecting a peerwire client.
pub struct ClientBuilder {
    registry: HandlerRegistry,
    heartbeat_interval: Duration,
    max_frame_size: usize,
}

impl ClientBuilder {
    /// Create a new client builder.
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Register a handler for a command id.
    pub fn handle<H: Handler>(mut self, command: u16, handler: H) -> Self {
        self.registry.register(command, handler);
        self
    }

    /// Set the heartbeat inactivity window. Default: 10 seconds.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the maximum accepted frame size (header + body) in bytes.
    pub fn max_frame_size(mut self, limit: usize) -> Self {
        self.max_frame_size = limit;
        self
    }

    /// Dial the peer once.
    ///
    /// Name resolution or connect failure is fatal to the attempt and
    /// returned to the caller. On success the connection task starts with
    /// the heartbeat timer armed.
    pub async fn connect<A: ToSocketAddrs>(self, addr: A) -> Result<Client> {
        let stream = TcpStream::connect(addr).await?;
        let peer = stream.peer_addr()?;
        tracing::debug!(%peer, "connected");

        let (reader, write_half) = stream.into_split();
        let (close_tx, close_rx) = watch::channel(false);
        let (writer, _writer_task) = spawn_writer_task(write_half, close_rx.clone());
        let (completion_tx, completion_rx) = oneshot::channel();

        let registry = Arc::new(self.registry);
        let loop_writer = writer.clone();
        let loop_close = close_tx.clone();

        let read_task = tokio::spawn(read_loop(
            reader,
            registry,
            loop_writer,
            loop_close,
            close_rx,
            completion_tx,
            peer,
            self.heartbeat_interval,
            self.max_frame_size,
        ));

        Ok(Client {
            writer,
            close: close_tx,
            completion: completion_rx,
            peer,
            _read_task: read_task,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A connected peerwire client.
pub struct Client {
    writer: WriterHandle,
    close: watch::Sender<bool>,
    completion: oneshot::Receiver<Disconnect>,
    peer: SocketAddr,
    _read_task: tokio::task::JoinHandle<()>,
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Write raw bytes to the connection, verbatim.
    ///
    /// The bytes are expected to already carry frame headers. Fails with
    /// [`PeerwireError::EmptyPayload`] if `data` is empty.
    pub async fn send(&self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(PeerwireError::EmptyPayload);
        }
        self.writer.send(Bytes::copy_from_slice(data)).await
    }

    /// Frame `body` under `command` and write it to the connection.
    pub async fn send_frame(&self, command: u16, body: &[u8]) -> Result<()> {
        if body.len() > MAX_BODY_SIZE {
            return Err(PeerwireError::Protocol(format!(
                "body length {} exceeds the 16-bit length field",
                body.len()
            )));
        }
        self.writer.send(Bytes::from(build_frame(command, body))).await
    }

    /// Close the connection.
    pub fn close(&self) {
        let _ = self.close.send(true);
    }

    /// Get the remote peer address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Wait until the connection terminates.
    ///
    /// Consumes the client and resolves to the [`Disconnect`] reason.
    pub async fn wait_for_disconnect(self) -> Result<Disconnect> {
        self.completion
            .await
            .map_err(|_| PeerwireError::ConnectionClosed)
    }
}

/// Client connection loop: reassemble frames, keep the heartbeat timer,
/// dispatch non-heartbeat frames, and report the termination reason.
#[allow(clippy::too_many_arguments)]
async fn read_loop(
    mut reader: OwnedReadHalf,
    registry: Arc<HandlerRegistry>,
    writer: WriterHandle,
    close_tx: watch::Sender<bool>,
    mut close_rx: watch::Receiver<bool>,
    completion_tx: oneshot::Sender<Disconnect>,
    peer: SocketAddr,
    heartbeat_interval: Duration,
    max_frame_size: usize,
) {
    let mut frames = FrameBuffer::with_max_frame_size(max_frame_size);
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    let idle = tokio::time::sleep(heartbeat_interval);
    tokio::pin!(idle);
    let mut armed = true;

    let reason = loop {
        tokio::select! {
            res = reader.read(&mut buf) => match res {
                Ok(0) => {
                    tracing::debug!(%peer, "peer closed the stream");
                    break Disconnect::Closed;
                }
                Ok(n) => {
                    let batch = match frames.push(&buf[..n]) {
                        Ok(batch) => batch,
                        Err(e) => {
                            tracing::error!(%peer, error = %e, "protocol violation, closing");
                            break Disconnect::Protocol;
                        }
                    };
                    for frame in batch {
                        // Any received frame re-arms the heartbeat timer.
                        idle.as_mut().reset(Instant::now() + heartbeat_interval);
                        armed = true;

                        if frame.is_heartbeat() {
                            tracing::debug!(%peer, "heartbeat pong");
                            continue;
                        }

                        let command = frame.command();
                        let req = Request::new(frame.header, frame.body, peer);
                        let rsp = Responder::new(writer.clone(), close_tx.clone(), peer);

                        match registry.dispatch(req, rsp).await {
                            Ok(()) => {}
                            Err(PeerwireError::UnknownCommand(_)) => {
                                tracing::warn!(%peer, command, "no handler registered, frame dropped");
                            }
                            Err(e) => {
                                tracing::error!(%peer, command, error = %e, "handler failed");
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(%peer, error = %e, "read failed, treating as disconnect");
                    break Disconnect::ReadError;
                }
            },
            _ = &mut idle, if armed => {
                // Fires once per arming; the next received frame re-arms.
                armed = false;
                tracing::debug!(%peer, "idle window elapsed, sending heartbeat");
                if writer.send(heartbeat_frame()).await.is_err() {
                    break Disconnect::Closed;
                }
            }
            _ = close_rx.changed() => {
                if *close_rx.borrow() {
                    tracing::debug!(%peer, "connection closed locally");
                    break Disconnect::Closed;
                }
            }
        }
    };

    // Stop the writer task and shut the outbound direction.
    let _ = close_tx.send(true);
    let _ = completion_tx.send(reason);

    tracing::debug!(%peer, ?reason, "connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = ClientBuilder::new();
        assert_eq!(builder.heartbeat_interval, DEFAULT_HEARTBEAT_INTERVAL);
        assert_eq!(builder.max_frame_size, DEFAULT_MAX_FRAME_SIZE);
        assert!(builder.registry.is_empty());
    }

    #[test]
    fn test_builder_chaining() {
        let builder = Client::builder()
            .handle(6, |_req: Request, _rsp: Responder| async { Ok(()) })
            .heartbeat_interval(Duration::from_millis(250))
            .max_frame_size(2048);

        assert!(builder.registry.contains(6));
        assert_eq!(builder.heartbeat_interval, Duration::from_millis(250));
        assert_eq!(builder.max_frame_size, 2048);
    }

    #[tokio::test]
    async fn test_connect_failure_is_fatal() {
        // Bind a listener and drop it so the port is very likely dead.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = Client::builder().connect(addr).await;
        assert!(result.is_err());
    }
}

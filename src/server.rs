//! Server role: TCP listener and per-connection frame loops.
//!
//! The [`ServerBuilder`] provides a fluent API for registering handlers and
//! binding the listener. [`Server::run`] then accepts connections
//! indefinitely, spawning one task per connection:
//! 1. Read socket bytes into the frame buffer
//! 2. Answer heartbeat pings in place
//! 3. Dispatch every other complete frame to its handler
//! 4. On EOF, read error, protocol violation, or `close()`, invoke the
//!    disconnect hook once and drop the connection
//!
//! # Example
//!
//! ```ignore
//! use peerwire::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::builder()
//!         .handle(5, |req, rsp| async move {
//!             rsp.send_frame(req.command(), req.body()).await
//!         })
//!         .on_disconnect(|peer| async move {
//!             println!("{peer} went away");
//!         })
//!         .bind("127.0.0.1:4000")
//!         .await?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::watch;

use crate::error::{PeerwireError, Result};
use crate::handler::{BoxFuture, Handler, HandlerRegistry, Request, Responder};
use crate::protocol::{heartbeat_frame, FrameBuffer, DEFAULT_MAX_FRAME_SIZE};
use crate::writer::{spawn_writer_task, WriterHandle};

/// Scratch buffer size for socket reads, shared by both roles.
pub const READ_BUFFER_SIZE: usize = 10240;

/// Hook invoked once per connection when it terminates.
///
/// Implemented for any `Fn(SocketAddr) -> Future<Output = ()>` closure.
pub trait DisconnectHook: Send + Sync + 'static {
    /// Observe the disconnection of `peer`.
    fn call(&self, peer: SocketAddr) -> BoxFuture<'static, ()>;
}

impl<F, Fut> DisconnectHook for F
where
    F: Fn(SocketAddr) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, peer: SocketAddr) -> BoxFuture<'static, ()> {
        Box::pin((self)(peer))
    }
}

/// Builder for configuring and binding a peerwire server.
pub struct ServerBuilder {
    registry: HandlerRegistry,
    on_disconnect: Option<Arc<dyn DisconnectHook>>,
    max_frame_size: usize,
}

impl ServerBuilder {
    /// Create a new server builder.
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            on_disconnect: None,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Register a handler for a command id.
    pub fn handle<H: Handler>(mut self, command: u16, handler: H) -> Self {
        self.registry.register(command, handler);
        self
    }

    /// Register a hook invoked once whenever a connection terminates.
    ///
    /// Lifecycle events stay out of the command dispatch path; this is the
    /// only way to observe disconnection on the server.
    pub fn on_disconnect<D: DisconnectHook>(mut self, hook: D) -> Self {
        self.on_disconnect = Some(Arc::new(hook));
        self
    }

    /// Set the maximum accepted frame size (header + body) in bytes.
    ///
    /// A peer declaring a longer frame is disconnected. Default: the
    /// wire-format maximum (6 + 65535).
    pub fn max_frame_size(mut self, limit: usize) -> Self {
        self.max_frame_size = limit;
        self
    }

    /// Bind the listener.
    ///
    /// Bind failure is fatal to the server and returned to the caller.
    pub async fn bind<A: ToSocketAddrs>(self, addr: A) -> Result<Server> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "server listening");

        Ok(Server {
            listener,
            registry: Arc::new(self.registry),
            on_disconnect: self.on_disconnect,
            max_frame_size: self.max_frame_size,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound peerwire server.
pub struct Server {
    listener: TcpListener,
    registry: Arc<HandlerRegistry>,
    on_disconnect: Option<Arc<dyn DisconnectHook>>,
    max_frame_size: usize,
}

impl Server {
    /// Create a new server builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Get the locally bound address (useful with an ephemeral port).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections indefinitely, one spawned task per connection.
    ///
    /// Only returns on accept failure.
    pub async fn run(self) -> Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;

            let registry = self.registry.clone();
            let hook = self.on_disconnect.clone();
            let max_frame_size = self.max_frame_size;

            tokio::spawn(async move {
                serve_connection(stream, peer, registry, hook, max_frame_size).await;
            });
        }
    }
}

/// Per-connection loop: reassemble frames, answer pings, dispatch the rest.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: Arc<HandlerRegistry>,
    hook: Option<Arc<dyn DisconnectHook>>,
    max_frame_size: usize,
) {
    tracing::debug!(%peer, "connection accepted");

    let (mut reader, write_half) = stream.into_split();
    let (close_tx, close_rx) = watch::channel(false);
    let (writer, _writer_task) = spawn_writer_task(write_half, close_rx.clone());

    let mut close_rx = close_rx;
    let mut frames = FrameBuffer::with_max_frame_size(max_frame_size);
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        tokio::select! {
            res = reader.read(&mut buf) => match res {
                Ok(0) => {
                    tracing::debug!(%peer, "peer closed the stream");
                    break;
                }
                Ok(n) => {
                    let batch = match frames.push(&buf[..n]) {
                        Ok(batch) => batch,
                        Err(e) => {
                            tracing::error!(%peer, error = %e, "protocol violation, closing");
                            break;
                        }
                    };
                    if !process_frames(batch, peer, &registry, &writer, &close_tx).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(%peer, error = %e, "read failed, treating as disconnect");
                    break;
                }
            },
            _ = close_rx.changed() => {
                if *close_rx.borrow() {
                    tracing::debug!(%peer, "connection closed locally");
                    break;
                }
            }
        }
    }

    // Stop the writer task and shut the outbound direction.
    let _ = close_tx.send(true);

    if let Some(hook) = hook {
        hook.call(peer).await;
    }

    tracing::debug!(%peer, "connection closed");
}

/// Handle one batch of complete frames. Returns `false` when the connection
/// should close.
async fn process_frames(
    batch: Vec<crate::protocol::Frame>,
    peer: SocketAddr,
    registry: &Arc<HandlerRegistry>,
    writer: &WriterHandle,
    close_tx: &watch::Sender<bool>,
) -> bool {
    for frame in batch {
        if frame.is_heartbeat() {
            tracing::debug!(%peer, "heartbeat ping, answering");
            if writer.send(heartbeat_frame()).await.is_err() {
                return false;
            }
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
    true
}

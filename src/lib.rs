//! # peerwire
//!
//! A minimal symmetric TCP message-framing protocol. Both peers exchange
//! discrete binary messages over a byte stream, each prefixed by a fixed
//! 6-byte header carrying a command id and body length.
//!
//! ## Architecture
//!
//! - **Protocol** ([`protocol`]): 6-byte header codec and per-connection
//!   frame reassembly at arbitrary read boundaries
//! - **Dispatch** ([`handler`]): command-id → handler routing, one
//!   synchronous invocation per non-heartbeat frame
//! - **Roles**: [`Server`] accepts many connections, one frame loop each;
//!   [`Client`] dials once and keeps the connection alive with heartbeats
//!
//! Reserved command ids: `1` is the heartbeat ping/pong (answered by the
//! server, never dispatched) and `3` the disconnect notification
//! (surfaced through [`ServerBuilder::on_disconnect`] instead of dispatch).
//!
//! ## Example
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
//!         .bind("127.0.0.1:4000")
//!         .await?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod handler;
pub mod protocol;

mod client;
mod server;
mod writer;

pub use client::{Client, ClientBuilder, Disconnect, DEFAULT_HEARTBEAT_INTERVAL};
pub use error::{PeerwireError, Result};
pub use handler::{Request, Responder};
pub use server::{DisconnectHook, Server, ServerBuilder, READ_BUFFER_SIZE};

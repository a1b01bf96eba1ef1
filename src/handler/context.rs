//! Request and responder views passed to handlers.
//!
//! A handler receives two values per dispatched frame:
//! - [`Request`] - the decoded header, the body, and the peer address
//! - [`Responder`] - write access to the same connection, plus `close`
//!
//! # Example
//!
//! ```ignore
//! async fn echo(req: Request, rsp: Responder) -> Result<()> {
//!     rsp.send_frame(req.command(), req.body()).await
//! }
//! ```

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::sync::watch;

use crate::error::{PeerwireError, Result};
use crate::protocol::{build_frame, Header, MAX_BODY_SIZE};
use crate::writer::WriterHandle;

/// One inbound frame, as seen by its handler.
#[derive(Debug, Clone)]
pub struct Request {
    header: Header,
    body: Bytes,
    peer: SocketAddr,
}

impl Request {
    pub(crate) fn new(header: Header, body: Bytes, peer: SocketAddr) -> Self {
        Self { header, body, peer }
    }

    /// Get the decoded frame header.
    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Get the command id.
    #[inline]
    pub fn command(&self) -> u16 {
        self.header.command
    }

    /// Get the body bytes.
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Get a clone of the body as `Bytes` (cheap, zero-copy).
    #[inline]
    pub fn body_bytes(&self) -> Bytes {
        self.body.clone()
    }

    /// Get the body length.
    #[inline]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Get the remote peer address.
    #[inline]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

/// Write access to the connection a request arrived on.
///
/// `Responder` is `Clone` and `'static`; a handler may stash it and write
/// back later from another task. Writes go through the connection's writer
/// task, so no locking is involved.
#[derive(Clone)]
pub struct Responder {
    writer: WriterHandle,
    close: watch::Sender<bool>,
    peer: SocketAddr,
}

impl Responder {
    pub(crate) fn new(writer: WriterHandle, close: watch::Sender<bool>, peer: SocketAddr) -> Self {
        Self {
            writer,
            close,
            peer,
        }
    }

    /// Write raw bytes to the connection, verbatim.
    ///
    /// The bytes are expected to already carry frame headers; nothing is
    /// added. Fails with [`PeerwireError::EmptyPayload`] if `data` is empty
    /// and with [`PeerwireError::ConnectionClosed`] once the connection is
    /// gone.
    pub async fn send(&self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(PeerwireError::EmptyPayload);
        }
        self.writer.send(Bytes::copy_from_slice(data)).await
    }

    /// Frame `body` under `command` and write it to the connection.
    ///
    /// A zero-length body is valid here; only raw [`send`](Self::send)
    /// rejects empty input.
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
    ///
    /// The connection's read loop and writer task both observe the signal and
    /// exit; on the server the disconnect hook still runs.
    pub fn close(&self) {
        let _ = self.close.send(true);
    }

    /// Get the remote peer address.
    #[inline]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::HEADER_SIZE;
    use crate::writer::spawn_writer_task;
    use tokio::io::{duplex, AsyncReadExt};

    fn test_peer() -> SocketAddr {
        "127.0.0.1:4000".parse().unwrap()
    }

    fn test_responder() -> (Responder, tokio::io::DuplexStream) {
        let (client, server) = duplex(4096);
        let (close_tx, close_rx) = watch::channel(false);
        let (writer, _task) = spawn_writer_task(client, close_rx);
        (Responder::new(writer, close_tx, test_peer()), server)
    }

    #[test]
    fn test_request_accessors() {
        let header = Header::new(5, 3);
        let req = Request::new(header, Bytes::from_static(b"ABC"), test_peer());

        assert_eq!(req.command(), 5);
        assert_eq!(req.body(), b"ABC");
        assert_eq!(req.body_len(), 3);
        assert_eq!(req.header().body_len, 3);
        assert_eq!(req.peer_addr(), test_peer());
    }

    #[tokio::test]
    async fn test_send_rejects_empty() {
        let (rsp, _server) = test_responder();
        let result = rsp.send(b"").await;
        assert!(matches!(result, Err(PeerwireError::EmptyPayload)));
    }

    #[tokio::test]
    async fn test_send_writes_verbatim() {
        let (rsp, mut server) = test_responder();

        rsp.send(b"\x00\x05\x00\x06\x00\x00").await.unwrap();

        let mut buf = vec![0u8; 16];
        let n = server.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"\x00\x05\x00\x06\x00\x00");
    }

    #[tokio::test]
    async fn test_send_frame_adds_header() {
        let (rsp, mut server) = test_responder();

        rsp.send_frame(7, b"pong").await.unwrap();

        let mut buf = vec![0u8; 32];
        let n = server.read(&mut buf).await.unwrap();
        assert_eq!(n, HEADER_SIZE + 4);

        let header = Header::decode(&buf).unwrap();
        assert_eq!(header.command, 7);
        assert_eq!(header.body_len, 4);
        assert_eq!(&buf[HEADER_SIZE..n], b"pong");
    }

    #[tokio::test]
    async fn test_send_frame_allows_empty_body() {
        let (rsp, mut server) = test_responder();

        rsp.send_frame(7, b"").await.unwrap();

        let mut buf = vec![0u8; 16];
        let n = server.read(&mut buf).await.unwrap();
        assert_eq!(n, HEADER_SIZE);
    }

    #[tokio::test]
    async fn test_close_stops_writer() {
        let (client, _server) = duplex(4096);
        let (close_tx, close_rx) = watch::channel(false);
        let (writer, task) = spawn_writer_task(client, close_rx);
        let rsp = Responder::new(writer, close_tx, test_peer());

        rsp.close();
        task.await.unwrap().unwrap();

        let result = rsp.send(b"late").await;
        assert!(matches!(result, Err(PeerwireError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_responder_is_clone() {
        let (rsp, _server) = test_responder();
        let rsp2 = rsp.clone();
        assert_eq!(rsp.peer_addr(), rsp2.peer_addr());
    }
}

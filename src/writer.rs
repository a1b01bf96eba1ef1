//! Dedicated writer task for outbound bytes.
//!
//! Heartbeat replies, handler responses, and caller-initiated sends can all
//! target the same socket, so each connection funnels outbound bytes through
//! one task fed by an mpsc channel instead of sharing the write half behind a
//! mutex.
//!
//! ```text
//! Handler ─┐
//! Heartbeat┼─► mpsc::Sender<Bytes> ─► Writer Task ─► TcpStream
//! Caller  ─┘
//! ```
//!
//! The task exits when every [`WriterHandle`] is dropped or when the
//! connection's close signal fires, dropping the write half and shutting the
//! outbound direction of the socket.

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::{PeerwireError, Result};

/// Capacity of the per-connection outbound channel.
pub(crate) const WRITE_CHANNEL_CAPACITY: usize = 64;

/// Handle for queueing bytes to a connection's writer task.
///
/// Cheaply cloneable; held by the connection loop, responders, and the client.
#[derive(Clone)]
pub(crate) struct WriterHandle {
    tx: mpsc::Sender<Bytes>,
}

impl WriterHandle {
    /// Queue pre-encoded wire bytes for writing.
    ///
    /// Fails with [`PeerwireError::ConnectionClosed`] once the writer task has
    /// exited.
    pub(crate) async fn send(&self, data: Bytes) -> Result<()> {
        self.tx
            .send(data)
            .await
            .map_err(|_| PeerwireError::ConnectionClosed)
    }
}

/// Spawn the writer task for a connection's write half.
///
/// Returns the sending handle and the task's join handle. The task stops on
/// channel close or when `closed` observes the connection close signal.
pub(crate) fn spawn_writer_task<W>(
    writer: W,
    closed: watch::Receiver<bool>,
) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(WRITE_CHANNEL_CAPACITY);
    let task = tokio::spawn(writer_loop(rx, writer, closed));
    (WriterHandle { tx }, task)
}

/// Main writer loop - receives byte chunks and writes them to the socket.
async fn writer_loop<W>(
    mut rx: mpsc::Receiver<Bytes>,
    mut writer: W,
    mut closed: watch::Receiver<bool>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            msg = rx.recv() => {
                let Some(data) = msg else {
                    // All handles dropped, clean shutdown.
                    return Ok(());
                };
                writer.write_all(&data).await?;
                writer.flush().await?;
            }
            res = closed.changed() => {
                // A dropped sender side also counts as closed.
                if res.is_err() || *closed.borrow() {
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt};

    fn close_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    #[tokio::test]
    async fn test_writer_handle_send() {
        let (client, mut server) = duplex(4096);
        let (_tx, closed) = close_channel();
        let (handle, _task) = spawn_writer_task(client, closed);

        handle.send(Bytes::from_static(b"hello")).await.unwrap();

        let mut buf = vec![0u8; 16];
        let n = server.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello");
    }

    #[tokio::test]
    async fn test_writer_preserves_order() {
        let (client, mut server) = duplex(4096);
        let (_tx, closed) = close_channel();
        let (handle, _task) = spawn_writer_task(client, closed);

        for i in 0..10u8 {
            handle.send(Bytes::copy_from_slice(&[i])).await.unwrap();
        }
        drop(handle);

        let mut buf = Vec::new();
        server.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, (0..10u8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_writer_shutdown_on_handle_drop() {
        let (client, _server) = duplex(4096);
        let (_tx, closed) = close_channel();
        let (handle, task) = spawn_writer_task(client, closed);

        drop(handle);

        let result = task.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_writer_stops_on_close_signal() {
        let (client, _server) = duplex(4096);
        let (tx, closed) = close_channel();
        let (handle, task) = spawn_writer_task(client, closed);

        tx.send(true).unwrap();
        task.await.unwrap().unwrap();

        // The handle now reports the connection closed.
        let result = handle.send(Bytes::from_static(b"late")).await;
        assert!(matches!(result, Err(PeerwireError::ConnectionClosed)));
    }
}

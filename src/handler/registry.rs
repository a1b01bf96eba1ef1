//! Handler registry for dispatching frames by command id.
//!
//! The registry is built by explicit registration before the connection loops
//! start and is read-only afterwards. Re-registering an id overwrites the
//! previous handler with a warning; registering a reserved id (heartbeat or
//! disconnect) is ignored with a warning, since those frames never reach
//! dispatch.
//!
//! # Example
//!
//! ```
//! use peerwire::handler::{HandlerRegistry, Request, Responder};
//!
//! let mut registry = HandlerRegistry::new();
//!
//! registry.register(5, |req: Request, rsp: Responder| async move {
//!     rsp.send_frame(req.command(), req.body()).await
//! });
//!
//! assert!(registry.contains(5));
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use super::{Request, Responder};
use crate::error::{PeerwireError, Result};
use crate::protocol::is_reserved;

/// Result type for handler functions.
pub type HandlerResult = Result<()>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for command handlers.
///
/// Implemented for any `Fn(Request, Responder) -> Future<Output = Result<()>>`
/// closure, so plain async closures register directly.
pub trait Handler: Send + Sync + 'static {
    /// Handle one dispatched frame.
    fn call(&self, req: Request, rsp: Responder) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request, Responder) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, req: Request, rsp: Responder) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self)(req, rsp))
    }
}

/// Registry mapping command ids to handlers.
pub struct HandlerRegistry {
    handlers: HashMap<u16, Box<dyn Handler>>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a command id.
    ///
    /// Overwriting an existing registration is allowed and logged as a
    /// warning; the new handler wins. Reserved ids are refused with a
    /// warning and the registration is dropped.
    pub fn register<H: Handler>(&mut self, command: u16, handler: H) {
        if is_reserved(command) {
            tracing::warn!(command, "command id is reserved, handler ignored");
            return;
        }
        if self.handlers.insert(command, Box::new(handler)).is_some() {
            tracing::warn!(command, "handler registered twice, previous replaced");
        }
    }

    /// Check whether a command id has a handler.
    pub fn contains(&self, command: u16) -> bool {
        self.handlers.contains_key(&command)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dispatch a request to the handler for its command id.
    ///
    /// Returns [`PeerwireError::UnknownCommand`] if no handler is registered;
    /// the connection loop logs that and drops the frame without replying.
    /// Handler invocation is synchronous on the caller's task: a slow handler
    /// stalls further frame processing for that connection only.
    pub async fn dispatch(&self, req: Request, rsp: Responder) -> Result<()> {
        let command = req.command();
        let handler = self
            .handlers
            .get(&command)
            .ok_or(PeerwireError::UnknownCommand(command))?;

        handler.call(req, rsp).await
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Header, DISCONNECT_COMMAND, HEARTBEAT_COMMAND};
    use crate::writer::spawn_writer_task;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::io::duplex;
    use tokio::sync::watch;

    fn test_request(command: u16, body: &'static [u8]) -> Request {
        Request::new(
            Header::new(command, body.len() as u16),
            Bytes::from_static(body),
            "127.0.0.1:4000".parse().unwrap(),
        )
    }

    fn test_responder() -> Responder {
        let (client, _server) = duplex(4096);
        let (close_tx, close_rx) = watch::channel(false);
        let (writer, _task) = spawn_writer_task(client, close_rx);
        Responder::new(writer, close_tx, "127.0.0.1:4000".parse().unwrap())
    }

    #[test]
    fn test_register_and_contains() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.is_empty());

        registry.register(5, |_req: Request, _rsp: Responder| async { Ok(()) });

        assert!(registry.contains(5));
        assert!(!registry.contains(6));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reserved_ids_refused() {
        let mut registry = HandlerRegistry::new();

        registry.register(HEARTBEAT_COMMAND, |_req: Request, _rsp: Responder| async {
            Ok(())
        });
        registry.register(DISCONNECT_COMMAND, |_req: Request, _rsp: Responder| async {
            Ok(())
        });

        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_invokes_handler() {
        let mut registry = HandlerRegistry::new();
        let hits = Arc::new(AtomicU32::new(0));

        let counter = hits.clone();
        registry.register(5, move |req: Request, _rsp: Responder| {
            let counter = counter.clone();
            async move {
                assert_eq!(req.body(), b"ABC");
                assert_eq!(req.body_len(), 3);
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        registry
            .dispatch(test_request(5, b"ABC"), test_responder())
            .await
            .unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_command() {
        let registry = HandlerRegistry::new();

        let result = registry
            .dispatch(test_request(99, b""), test_responder())
            .await;

        assert!(matches!(result, Err(PeerwireError::UnknownCommand(99))));
    }

    #[tokio::test]
    async fn test_overwrite_replaces_handler() {
        let mut registry = HandlerRegistry::new();
        let which = Arc::new(AtomicU32::new(0));

        let first = which.clone();
        registry.register(5, move |_req: Request, _rsp: Responder| {
            let first = first.clone();
            async move {
                first.store(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let second = which.clone();
        registry.register(5, move |_req: Request, _rsp: Responder| {
            let second = second.clone();
            async move {
                second.store(2, Ordering::SeqCst);
                Ok(())
            }
        });

        assert_eq!(registry.len(), 1);

        registry
            .dispatch(test_request(5, b""), test_responder())
            .await
            .unwrap();

        assert_eq!(which.load(Ordering::SeqCst), 2);
    }
}

//! Handler module - frame dispatch.
//!
//! Provides:
//! - [`HandlerRegistry`] - maps command ids to handlers
//! - [`Request`] / [`Responder`] - the views a handler works with
//!
//! # Example
//!
//! ```
//! use peerwire::handler::{HandlerRegistry, Request, Responder};
//!
//! let mut registry = HandlerRegistry::new();
//!
//! // Echo the body back under the same command id.
//! registry.register(5, |req: Request, rsp: Responder| async move {
//!     rsp.send_frame(req.command(), req.body()).await
//! });
//! ```

mod context;
mod registry;

pub use context::{Request, Responder};
pub use registry::{BoxFuture, Handler, HandlerRegistry, HandlerResult};

//! Error types for peerwire.

use thiserror::Error;

/// Main error type for all peerwire operations.
#[derive(Debug, Error)]
pub enum PeerwireError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol error (malformed header, frame over the size cap, etc.).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No handler registered for the given command id.
    #[error("no handler registered for command {0}")]
    UnknownCommand(u16),

    /// Raw send called with an empty byte sequence.
    #[error("send data is empty")]
    EmptyPayload,

    /// Connection closed while an operation was in flight.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Result type alias using PeerwireError.
pub type Result<T> = std::result::Result<T, PeerwireError>;

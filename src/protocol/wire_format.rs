//! Wire format encoding and decoding.
//!
//! Implements the 6-byte header format:
//! ```text
//! ┌──────────┬─────────┬────────────┬──────────┐
//! │ Command  │ Version │ Header Len │ Body Len │
//! │ 2 bytes  │ 1 byte  │ 1 byte     │ 2 bytes  │
//! │ uint16 BE│         │ (always 6) │ uint16 BE│
//! └──────────┴─────────┴────────────┴──────────┘
//! ```
//!
//! All multi-byte integers are Big Endian.

use crate::error::{PeerwireError, Result};

/// Header size in bytes (fixed, exactly 6).
pub const HEADER_SIZE: usize = 6;

/// Protocol version written into outbound headers.
pub const PROTOCOL_VERSION: u8 = 0;

/// Reserved command id for heartbeat ping/pong (zero body, never dispatched).
pub const HEARTBEAT_COMMAND: u16 = 1;

/// Reserved command id for disconnect notification (zero body).
///
/// Disconnects are surfaced through
/// [`ServerBuilder::on_disconnect`](crate::ServerBuilder::on_disconnect)
/// rather than dispatch, but the id stays reserved on the wire.
pub const DISCONNECT_COMMAND: u16 = 3;

/// Maximum body size representable by the 16-bit length field.
pub const MAX_BODY_SIZE: usize = u16::MAX as usize;

/// Default maximum frame size (header + body): the wire-format maximum.
pub const DEFAULT_MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_BODY_SIZE;

/// Check whether a command id is reserved for protocol-internal use.
#[inline]
pub fn is_reserved(command: u16) -> bool {
    command == HEARTBEAT_COMMAND || command == DISCONNECT_COMMAND
}

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Command identifier used for dispatch.
    pub command: u16,
    /// Protocol version (carried, not validated).
    pub version: u8,
    /// Declared header length; must be 6 for a frame to be valid.
    pub header_len: u8,
    /// Body length in bytes.
    pub body_len: u16,
}

impl Header {
    /// Create a new header for an outbound frame.
    ///
    /// `header_len` is fixed to [`HEADER_SIZE`] and `version` to
    /// [`PROTOCOL_VERSION`].
    pub fn new(command: u16, body_len: u16) -> Self {
        Self {
            command,
            version: PROTOCOL_VERSION,
            header_len: HEADER_SIZE as u8,
            body_len,
        }
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// The `header_len` byte is always written as the constant 6 (the size of
    /// the encoding itself), regardless of the field value.
    ///
    /// # Example
    ///
    /// ```
    /// use peerwire::protocol::Header;
    ///
    /// let header = Header::new(5, 3);
    /// assert_eq!(header.encode(), [0x00, 0x05, 0x00, 0x06, 0x00, 0x03]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..2].copy_from_slice(&self.command.to_be_bytes());
        buf[2] = self.version;
        buf[3] = HEADER_SIZE as u8;
        buf[4..6].copy_from_slice(&self.body_len.to_be_bytes());
        buf
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `None` if fewer than 6 bytes are available. That is not an
    /// error: the reassembler treats it as a signal to wait for more input.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            command: u16::from_be_bytes([buf[0], buf[1]]),
            version: buf[2],
            header_len: buf[3],
            body_len: u16::from_be_bytes([buf[4], buf[5]]),
        })
    }

    /// Validate the header for protocol compliance.
    ///
    /// Checks that the declared header length is exactly 6 and that the
    /// declared frame length fits within `max_frame_size`.
    pub fn validate(&self, max_frame_size: usize) -> Result<()> {
        if self.header_len as usize != HEADER_SIZE {
            return Err(PeerwireError::Protocol(format!(
                "declared header length {} is not {}",
                self.header_len, HEADER_SIZE
            )));
        }

        if self.frame_len() > max_frame_size {
            return Err(PeerwireError::Protocol(format!(
                "frame length {} exceeds maximum {}",
                self.frame_len(),
                max_frame_size
            )));
        }

        Ok(())
    }

    /// Total frame length declared by this header (header + body).
    #[inline]
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.body_len as usize
    }

    /// Check if this is a heartbeat frame.
    #[inline]
    pub fn is_heartbeat(&self) -> bool {
        self.command == HEARTBEAT_COMMAND
    }
}

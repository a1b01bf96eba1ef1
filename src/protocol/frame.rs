//! Frame struct with typed accessors.
//!
//! Represents a complete protocol frame with header and body.
//! Uses `bytes::Bytes` for zero-copy body sharing.
//!
//! # Example
//!
//! ```
//! use peerwire::protocol::{Frame, Header};
//! use bytes::Bytes;
//!
//! let header = Header::new(5, 3);
//! let frame = Frame::new(header, Bytes::from_static(b"ABC"));
//!
//! assert_eq!(frame.command(), 5);
//! assert_eq!(frame.body(), b"ABC");
//! ```

use bytes::Bytes;

use super::wire_format::{Header, HEADER_SIZE, HEARTBEAT_COMMAND, MAX_BODY_SIZE};

/// A heartbeat ping/pong on the wire: command 1, version 0, zero body.
const HEARTBEAT_BYTES: [u8; HEADER_SIZE] = [0x00, 0x01, 0x00, 0x06, 0x00, 0x00];

/// A complete protocol frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Body bytes (zero-copy via `bytes::Bytes`).
    pub body: Bytes,
}

impl Frame {
    /// Create a new frame from header and body.
    pub fn new(header: Header, body: Bytes) -> Self {
        Self { header, body }
    }

    /// Get a reference to the body bytes.
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Get the body length.
    #[inline]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Get the command id.
    #[inline]
    pub fn command(&self) -> u16 {
        self.header.command
    }

    /// Get the protocol version byte.
    #[inline]
    pub fn version(&self) -> u8 {
        self.header.version
    }

    /// Check if this is a heartbeat frame.
    #[inline]
    pub fn is_heartbeat(&self) -> bool {
        self.header.command == HEARTBEAT_COMMAND
    }
}

/// Build a complete frame as a single byte vector.
///
/// Encodes a header for `command` with the body's length and appends the body
/// into a contiguous buffer, ready for a raw send.
///
/// # Panics
///
/// Panics if `body` is longer than [`MAX_BODY_SIZE`](super::MAX_BODY_SIZE).
///
/// # Example
///
/// ```
/// use peerwire::protocol::{build_frame, HEADER_SIZE};
///
/// let bytes = build_frame(5, b"ABC");
/// assert_eq!(bytes.len(), HEADER_SIZE + 3);
/// assert_eq!(&bytes[..HEADER_SIZE], &[0x00, 0x05, 0x00, 0x06, 0x00, 0x03]);
/// ```
pub fn build_frame(command: u16, body: &[u8]) -> Vec<u8> {
    assert!(
        body.len() <= MAX_BODY_SIZE,
        "body length {} exceeds the 16-bit length field",
        body.len()
    );
    let header = Header::new(command, body.len() as u16);
    let mut buf = Vec::with_capacity(HEADER_SIZE + body.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(body);
    buf
}

/// The zero-body heartbeat frame, shared without allocation.
#[inline]
pub(crate) fn heartbeat_frame() -> Bytes {
    Bytes::from_static(&HEARTBEAT_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let header = Header::new(5, 5);
        let frame = Frame::new(header, Bytes::from_static(b"hello"));

        assert_eq!(frame.command(), 5);
        assert_eq!(frame.version(), 0);
        assert_eq!(frame.body(), b"hello");
        assert_eq!(frame.body_len(), 5);
        assert!(!frame.is_heartbeat());
    }

    #[test]
    fn test_frame_empty_body() {
        let frame = Frame::new(Header::new(2, 0), Bytes::new());

        assert_eq!(frame.body_len(), 0);
        assert!(frame.body().is_empty());
    }

    #[test]
    fn test_frame_is_heartbeat() {
        let frame = Frame::new(Header::new(HEARTBEAT_COMMAND, 0), Bytes::new());
        assert!(frame.is_heartbeat());
    }

    #[test]
    fn test_build_frame() {
        let bytes = build_frame(5, b"ABC");

        assert_eq!(bytes.len(), HEADER_SIZE + 3);

        let header = Header::decode(&bytes).unwrap();
        assert_eq!(header.command, 5);
        assert_eq!(header.body_len, 3);
        assert_eq!(&bytes[HEADER_SIZE..], b"ABC");
    }

    #[test]
    fn test_build_frame_empty_body() {
        let bytes = build_frame(9, b"");
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(Header::decode(&bytes).unwrap().body_len, 0);
    }

    #[test]
    fn test_heartbeat_frame_matches_encoded_header() {
        let expected = Header::new(HEARTBEAT_COMMAND, 0).encode();
        assert_eq!(&heartbeat_frame()[..], &expected[..]);

        let header = Header::decode(&heartbeat_frame()).unwrap();
        assert!(header.is_heartbeat());
        assert_eq!(header.body_len, 0);
    }
}

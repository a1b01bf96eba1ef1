//! Frame buffer for reassembling a byte stream into frames.
//!
//! Frame boundaries are not aligned with socket read boundaries, so each
//! connection accumulates raw bytes here and extracts zero or more complete
//! frames per read. Uses `bytes::BytesMut` for buffer management and a state
//! machine for fragmented frames:
//! - `WaitingForHeader`: need at least 6 bytes
//! - `WaitingForBody`: header parsed, need N more body bytes
//!
//! A header that declares more bytes than are currently buffered is not an
//! error; the buffer waits for the remainder. A header that declares a frame
//! longer than the configured maximum is a protocol violation and the
//! connection owning the buffer is expected to close.

use bytes::{Bytes, BytesMut};

use super::wire_format::{Header, DEFAULT_MAX_FRAME_SIZE, HEADER_SIZE};
use super::Frame;
use crate::error::Result;

/// State machine for frame parsing.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for a complete header (need 6 bytes).
    WaitingForHeader,
    /// Header parsed, waiting for the declared body bytes.
    WaitingForBody { header: Header },
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
///
/// The buffer always holds the unconsumed suffix of everything received so
/// far, in order; bytes leave it only as whole frames.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed frame size (header + body).
    max_frame_size: usize,
}

impl FrameBuffer {
    /// Create a new frame buffer with the default frame size cap.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a new frame buffer with a custom frame size cap.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4 * 1024),
            state: State::WaitingForHeader,
            max_frame_size,
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// This is the main API for processing incoming socket data. Returns the
    /// complete frames in arrival order; partial data stays buffered for the
    /// next push.
    ///
    /// # Errors
    ///
    /// Returns an error if a header declares a length other than 6 or a frame
    /// larger than the configured maximum. The buffer is unusable for the
    /// connection afterwards; callers close on error.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }

        Ok(frames)
    }

    /// Try to extract a single frame from the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` if a complete frame was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` on protocol violation
    fn try_extract_one(&mut self) -> Result<Option<Frame>> {
        match &self.state {
            State::WaitingForHeader => {
                let Some(header) = Header::decode(&self.buffer) else {
                    return Ok(None);
                };

                header.validate(self.max_frame_size)?;

                let _ = self.buffer.split_to(HEADER_SIZE);

                if header.body_len == 0 {
                    return Ok(Some(Frame::new(header, Bytes::new())));
                }

                self.state = State::WaitingForBody { header };

                // The body may already be buffered.
                self.try_extract_one()
            }

            State::WaitingForBody { header } => {
                let body_len = header.body_len as usize;

                if self.buffer.len() < body_len {
                    return Ok(None);
                }

                let body = self.buffer.split_to(body_len).freeze();
                let header = *header;

                self.state = State::WaitingForHeader;

                Ok(Some(Frame::new(header, body)))
            }
        }
    }

    /// Get the number of buffered, not-yet-consumed bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Get the current state for debugging.
    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::WaitingForHeader => "WaitingForHeader",
            State::WaitingForBody { .. } => "WaitingForBody",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

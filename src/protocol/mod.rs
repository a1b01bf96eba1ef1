//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the binary protocol shared by both roles:
//! - 6-byte header encoding/decoding
//! - Frame buffer for reassembling arbitrary read boundaries
//! - Frame struct with typed accessors

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{build_frame, Frame};
pub use frame_buffer::FrameBuffer;
pub use wire_format::{
    is_reserved, Header, DEFAULT_MAX_FRAME_SIZE, DISCONNECT_COMMAND, HEADER_SIZE,
    HEARTBEAT_COMMAND, MAX_BODY_SIZE, PROTOCOL_VERSION,
};

pub(crate) use frame::heartbeat_frame;

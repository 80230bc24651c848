//! Byte-level framing.
//!
//! Turns a TCP byte stream into [`Frame`]s and back. Payloads stay opaque
//! here; [`crate::codec`] gives them meaning.

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{build_frame, Frame};
pub use frame_buffer::FrameBuffer;
pub use wire_format::{
    Header, ABSOLUTE_MAX_PAYLOAD_SIZE, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE, MAGIC, NO_CALL_ID,
    PAD_BYTE, PROTOCOL_VERSION,
};

//! Reassembly of frames from arbitrarily split socket reads.
//!
//! The buffer alternates between two phases: collecting the 16 header bytes,
//! then collecting `payload_length` payload bytes. A header is validated the
//! moment its last byte arrives, so a foreign magic number or an oversized
//! length is reported before any payload is read.
//!
//! Frames that completed ahead of a broken header in the same read are still
//! returned. The fault is then held back and reported by
//! [`FrameBuffer::take_fault`] or the next `push`.
//!
//! ```
//! use chatwire::protocol::{build_frame, FrameBuffer, Header};
//!
//! let bytes = build_frame(&Header::new(1, 2, 0, 2), b"hi");
//! let mut buffer = FrameBuffer::new();
//!
//! assert!(buffer.push(&bytes[..7]).unwrap().is_empty());
//! let frames = buffer.push(&bytes[7..]).unwrap();
//! assert_eq!(frames.len(), 1);
//! ```

use bytes::{Buf, BytesMut};

use super::wire_format::{Header, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE};
use super::Frame;
use crate::error::{ChatwireError, Result};

/// Per-connection accumulation buffer.
///
/// Once a fault is reported the stream is out of sync; the connection must
/// be dropped together with its buffer.
#[derive(Debug)]
pub struct FrameBuffer {
    bytes: BytesMut,
    /// Header whose payload is still incomplete.
    awaiting: Option<Header>,
    /// Protocol fault found behind frames already handed out.
    fault: Option<ChatwireError>,
    max_payload_size: u32,
}

impl FrameBuffer {
    /// Buffer accepting payloads up to 8 MiB.
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Buffer rejecting headers that announce more than `max_payload_size`.
    pub fn with_max_payload(max_payload_size: u32) -> Self {
        Self {
            bytes: BytesMut::with_capacity(8 * 1024),
            awaiting: None,
            fault: None,
            max_payload_size,
        }
    }

    /// Append `data` and drain every frame it completes.
    ///
    /// Leftover bytes stay buffered for the next call. When a broken header
    /// follows complete frames, those frames are returned and the fault is
    /// kept for [`FrameBuffer::take_fault`].
    ///
    /// # Errors
    ///
    /// `BadMagic`, `UnsupportedVersion` or `PayloadTooLarge` for a header
    /// that breaks the protocol, once no complete frame precedes it.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        if let Some(fault) = self.fault.take() {
            return Err(fault);
        }
        self.bytes.extend_from_slice(data);

        let mut frames = Vec::new();
        if let Err(fault) = self.drain_into(&mut frames) {
            if frames.is_empty() {
                return Err(fault);
            }
            self.fault = Some(fault);
        }
        Ok(frames)
    }

    /// Fault held back by the last `push`, if any.
    ///
    /// Readers check this after dispatching the frames `push` returned.
    pub fn take_fault(&mut self) -> Option<ChatwireError> {
        self.fault.take()
    }

    fn drain_into(&mut self, frames: &mut Vec<Frame>) -> Result<()> {
        loop {
            let header = match self.awaiting.take() {
                Some(header) => header,
                None => match Header::decode(&self.bytes)? {
                    Some(header) => {
                        header.validate(self.max_payload_size)?;
                        self.bytes.advance(HEADER_SIZE);
                        header
                    }
                    None => return Ok(()),
                },
            };

            let len = header.payload_length as usize;
            if self.bytes.len() < len {
                self.awaiting = Some(header);
                return Ok(());
            }
            frames.push(Frame::new(header, self.bytes.split_to(len).freeze()));
        }
    }

    /// Bytes held that do not yet form a frame.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[cfg(test)]
    fn mid_payload(&self) -> bool {
        self.awaiting.is_some()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

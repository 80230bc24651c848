//! A decoded frame: validated header plus the raw payload bytes.

use bytes::Bytes;

use super::wire_format::{Header, HEADER_SIZE};

/// One complete unit read off the wire. The payload is still serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: Header,
    pub payload: Bytes,
}

impl Frame {
    /// Frame over `payload` without copying.
    pub fn new(header: Header, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// Frame over a copy of `payload`. Handy in tests.
    pub fn from_parts(header: Header, payload: &[u8]) -> Self {
        Self::new(header, Bytes::copy_from_slice(payload))
    }

    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Message kind tag.
    #[inline]
    pub fn kind(&self) -> u8 {
        self.header.kind
    }

    /// Serializer id the sender wrote the payload with.
    #[inline]
    pub fn serializer(&self) -> u8 {
        self.header.serializer
    }

    #[inline]
    pub fn call_id(&self) -> i32 {
        self.header.call_id
    }
}

/// Header and payload as one contiguous buffer.
///
/// ```
/// use chatwire::protocol::{build_frame, Header, HEADER_SIZE};
///
/// let bytes = build_frame(&Header::new(1, 14, 0, 0), b"");
/// assert_eq!(bytes.len(), HEADER_SIZE);
/// ```
pub fn build_frame(header: &Header, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::FrameBuffer;

    #[test]
    fn test_accessors_read_header() {
        let frame = Frame::from_parts(Header::new(0, 12, 42, 4), b"team");

        assert_eq!(frame.kind(), 12);
        assert_eq!(frame.serializer(), 0);
        assert_eq!(frame.call_id(), 42);
        assert_eq!(frame.payload(), b"team");
    }

    #[test]
    fn test_build_frame_layout() {
        let header = Header::new(1, 2, 0, 5);
        let bytes = build_frame(&header, b"hello");

        assert_eq!(bytes.len(), HEADER_SIZE + 5);
        assert_eq!(Header::decode(&bytes).unwrap(), Some(header));
        assert_eq!(&bytes[HEADER_SIZE..], b"hello");
    }

    #[test]
    fn test_built_frame_is_read_back_whole() {
        let bytes = build_frame(&Header::new(0, 101, 456, 10), b"0123456789");

        let frames = FrameBuffer::new().push(&bytes).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].call_id(), 456);
        assert_eq!(frames[0].payload(), b"0123456789");
    }
}

//! The fixed 16-byte frame header.
//!
//! ```text
//! offset  0      4    5      6     7         11    12          16
//!         +------+----+------+-----+---------+-----+-----------+---------
//!         |magic |ver |serial|kind | call id | pad | length    | payload
//!         |01020304   |      |     | i32 BE  | FF  | u32 BE    |
//!         +------+----+------+-----+---------+-----+-----------+---------
//! ```

use bytes::{Buf, BufMut};

use crate::error::{ChatwireError, Result};

/// Bytes before every payload.
pub const HEADER_SIZE: usize = 16;

/// Opens every frame; anything else means the peer does not speak chatwire.
pub const MAGIC: [u8; 4] = [1, 2, 3, 4];

pub const PROTOCOL_VERSION: u8 = 1;

/// Alignment byte after the call id. Written, never checked.
pub const PAD_BYTE: u8 = 0xFF;

/// Payload cap used unless configured otherwise (8 MiB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 8 * 1024 * 1024;

/// Lengths above `i32::MAX` are refused whatever the configured cap.
pub const ABSOLUTE_MAX_PAYLOAD_SIZE: u32 = i32::MAX as u32;

/// Call id carried by frames outside an RPC exchange.
pub const NO_CALL_ID: i32 = 0;

/// Decoded header fields, magic and pad excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    /// Serializer id, see [`crate::codec::SerializerKind`].
    pub serializer: u8,
    /// Message kind tag, see [`crate::message::MessageKind`].
    pub kind: u8,
    pub call_id: i32,
    pub payload_length: u32,
}

impl Header {
    /// Header for the current protocol version.
    pub fn new(serializer: u8, kind: u8, call_id: i32, payload_length: u32) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            serializer,
            kind,
            call_id,
            payload_length,
        }
    }

    /// ```
    /// use chatwire::protocol::Header;
    ///
    /// let bytes = Header::new(1, 2, 42, 100).encode();
    /// assert_eq!(&bytes[..4], &[1, 2, 3, 4]);
    /// assert_eq!(&bytes[7..11], &42i32.to_be_bytes());
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        let mut cursor = &mut out[..];
        cursor.put_slice(&MAGIC);
        cursor.put_u8(self.version);
        cursor.put_u8(self.serializer);
        cursor.put_u8(self.kind);
        cursor.put_i32(self.call_id);
        cursor.put_u8(PAD_BYTE);
        cursor.put_u32(self.payload_length);
        out
    }

    /// Parse the first 16 bytes of `buf`.
    ///
    /// `Ok(None)` while fewer than 16 bytes are available. A wrong magic
    /// number fails immediately with `BadMagic`; other fields are checked by
    /// [`Header::validate`].
    pub fn decode(buf: &[u8]) -> Result<Option<Self>> {
        if buf.len() < HEADER_SIZE {
            return Ok(None);
        }
        let mut cursor = &buf[..HEADER_SIZE];

        let mut magic = [0u8; 4];
        cursor.copy_to_slice(&mut magic);
        if magic != MAGIC {
            return Err(ChatwireError::BadMagic(magic));
        }

        let version = cursor.get_u8();
        let serializer = cursor.get_u8();
        let kind = cursor.get_u8();
        let call_id = cursor.get_i32();
        let _pad = cursor.get_u8();
        let payload_length = cursor.get_u32();

        Ok(Some(Self {
            version,
            serializer,
            kind,
            call_id,
            payload_length,
        }))
    }

    /// Reject foreign versions and lengths above `max_payload_size`.
    pub fn validate(&self, max_payload_size: u32) -> Result<()> {
        if self.version != PROTOCOL_VERSION {
            return Err(ChatwireError::UnsupportedVersion(self.version));
        }
        let max = max_payload_size.min(ABSOLUTE_MAX_PAYLOAD_SIZE);
        if self.payload_length > max {
            return Err(ChatwireError::PayloadTooLarge {
                size: self.payload_length,
                max,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_offsets() {
        let bytes = Header::new(1, 0x0C, 0x04050607, 0x08090A0B).encode();

        assert_eq!(
            bytes,
            [1, 2, 3, 4, 1, 1, 0x0C, 4, 5, 6, 7, 0xFF, 8, 9, 0x0A, 0x0B]
        );
    }

    #[test]
    fn test_decode_reads_back_encode() {
        let header = Header::new(0, 102, -7, 100);
        assert_eq!(Header::decode(&header.encode()).unwrap(), Some(header));
    }

    #[test]
    fn test_short_buffer_waits() {
        let bytes = Header::new(0, 14, 0, 0).encode();
        assert_eq!(Header::decode(&bytes[..HEADER_SIZE - 1]).unwrap(), None);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = Header::new(0, 0, 0, 0).encode();
        bytes[0] = 0xAA;
        assert!(matches!(
            Header::decode(&bytes),
            Err(ChatwireError::BadMagic([0xAA, 2, 3, 4]))
        ));
    }

    #[test]
    fn test_pad_byte_ignored() {
        let mut bytes = Header::new(0, 14, 0, 0).encode();
        bytes[11] = 0;
        assert!(Header::decode(&bytes).unwrap().is_some());
    }

    #[test]
    fn test_validate() {
        assert!(Header::new(0, 0, 1, 100).validate(100).is_ok());
        assert!(matches!(
            Header::new(0, 0, 1, 101).validate(100),
            Err(ChatwireError::PayloadTooLarge { size: 101, max: 100 })
        ));

        let mut header = Header::new(0, 0, 0, 0);
        header.version = 9;
        assert!(matches!(
            header.validate(DEFAULT_MAX_PAYLOAD_SIZE),
            Err(ChatwireError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_absolute_ceiling_applies_to_any_cap() {
        let header = Header::new(0, 0, 0, ABSOLUTE_MAX_PAYLOAD_SIZE + 1);
        assert!(matches!(
            header.validate(u32::MAX),
            Err(ChatwireError::PayloadTooLarge { max, .. }) if max == ABSOLUTE_MAX_PAYLOAD_SIZE
        ));
    }
}

//! MsgPack codec using `rmp-serde` (serializer id 0, the native binary form).
//!
//! Structs are written with `to_vec_named` so that field order does not
//! matter between peers.
//!
//! # Example
//!
//! ```
//! use chatwire::codec::MsgPackCodec;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Login {
//!     username: String,
//!     password: String,
//! }
//!
//! let msg = Login { username: "zhangsan".to_string(), password: "123".to_string() };
//! let encoded = MsgPackCodec::encode(&msg).unwrap();
//! let decoded: Login = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, msg);
//! ```

use std::io::Cursor;

use crate::error::{ChatwireError, Result};

/// MessagePack payloads, serializer id 0.
pub struct MsgPackCodec;

impl MsgPackCodec {
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// The whole slice must be consumed; leftover bytes mean the frame length
    /// and the encoded value disagree.
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        let mut cursor = Cursor::new(bytes);
        let value = rmp_serde::from_read(&mut cursor)?;
        let consumed = cursor.position() as usize;
        if consumed != bytes.len() {
            return Err(ChatwireError::Protocol(format!(
                "{} trailing bytes after MsgPack value",
                bytes.len() - consumed
            )));
        }
        Ok(value)
    }
}

//! Serializer selection.
//!
//! Each frame names the strategy its payload was written with, so a peer can
//! read both forms no matter which one it writes.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{JsonCodec, MsgPackCodec};
use crate::error::{ChatwireError, Result};

/// Payload serialization strategy, identified on the wire by a single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SerializerKind {
    /// MessagePack (id 0).
    Binary = 0,
    /// JSON (id 1).
    #[default]
    Json = 1,
}

impl SerializerKind {
    /// Wire id of this serializer.
    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Look a serializer up by wire id.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(SerializerKind::Binary),
            1 => Ok(SerializerKind::Json),
            other => Err(ChatwireError::UnknownSerializer(other)),
        }
    }

    /// Serialize a value with this strategy.
    pub fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>> {
        match self {
            SerializerKind::Binary => MsgPackCodec::encode(value),
            SerializerKind::Json => JsonCodec::encode(value),
        }
    }

    /// Deserialize a value with this strategy.
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T> {
        match self {
            SerializerKind::Binary => MsgPackCodec::decode(bytes),
            SerializerKind::Json => JsonCodec::decode(bytes),
        }
    }
}

impl fmt::Display for SerializerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializerKind::Binary => f.write_str("binary"),
            SerializerKind::Json => f.write_str("json"),
        }
    }
}

impl FromStr for SerializerKind {
    type Err = ChatwireError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binary" | "msgpack" | "0" => Ok(SerializerKind::Binary),
            "json" | "text" | "1" => Ok(SerializerKind::Json),
            other => Err(ChatwireError::Protocol(format!(
                "unknown serializer '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids() {
        assert_eq!(SerializerKind::Binary.id(), 0);
        assert_eq!(SerializerKind::Json.id(), 1);
        assert_eq!(SerializerKind::from_id(0).unwrap(), SerializerKind::Binary);
        assert_eq!(SerializerKind::from_id(1).unwrap(), SerializerKind::Json);
        assert!(matches!(
            SerializerKind::from_id(2),
            Err(ChatwireError::UnknownSerializer(2))
        ));
    }

    #[test]
    fn test_strategies_are_not_interchangeable() {
        let json = SerializerKind::Json.encode(&"hello").unwrap();
        let result: Result<String> = SerializerKind::Binary.decode(&json);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("msgpack".parse::<SerializerKind>().unwrap(), SerializerKind::Binary);
        assert_eq!("JSON".parse::<SerializerKind>().unwrap(), SerializerKind::Json);
        assert!("xml".parse::<SerializerKind>().is_err());
    }
}

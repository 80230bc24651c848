//! JSON codec using `serde_json` (serializer id 1, the text form).

use crate::error::Result;

/// JSON codec for structured data.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value to JSON bytes.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    /// Decode JSON bytes to a value. Trailing garbage is an error.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Chat {
        from: String,
        to: String,
        content: String,
    }

    #[test]
    fn test_encode_is_plain_json() {
        let chat = Chat {
            from: "a".to_string(),
            to: "b".to_string(),
            content: "hi".to_string(),
        };
        let encoded = JsonCodec::encode(&chat).unwrap();
        assert_eq!(
            std::str::from_utf8(&encoded).unwrap(),
            r#"{"from":"a","to":"b","content":"hi"}"#
        );
    }

    #[test]
    fn test_decode_missing_field_fails() {
        let result: Result<Chat> = JsonCodec::decode(br#"{"from":"a"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_trailing_garbage_fails() {
        let result: Result<Chat> =
            JsonCodec::decode(br#"{"from":"a","to":"b","content":"c"} x"#);
        assert!(result.is_err());
    }
}

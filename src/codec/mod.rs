//! Payload serialization.
//!
//! Two serializers share the wire, chosen per frame by the serializer byte:
//! [`MsgPackCodec`] (id 0, "binary") and [`JsonCodec`] (id 1). A peer may
//! write with either; [`MessageCodec`] always decodes with whatever the frame
//! says and encodes with its own configured [`SerializerKind`].
//!
//! ```
//! use chatwire::codec::{JsonCodec, MsgPackCodec};
//!
//! let packed = MsgPackCodec::encode(&"hello").unwrap();
//! assert_eq!(MsgPackCodec::decode::<String>(&packed).unwrap(), "hello");
//!
//! assert_eq!(JsonCodec::encode(&vec![1, 2]).unwrap(), b"[1,2]");
//! ```

mod json;
mod message_codec;
mod msgpack;
mod serializer;

pub use json::JsonCodec;
pub use message_codec::MessageCodec;
pub use msgpack::MsgPackCodec;
pub use serializer::SerializerKind;

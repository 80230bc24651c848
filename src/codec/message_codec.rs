//! Message <-> frame translation.
//!
//! Encoding fills every header field from the message and the configured
//! serializer. Decoding resolves the payload shape from the kind tag and the
//! serializer from the frame's own serializer id.

use bytes::Bytes;
use serde::de::DeserializeOwned;

use super::SerializerKind;
use crate::error::{ChatwireError, Result};
use crate::message::{Message, MessageKind};
use crate::protocol::{build_frame, Frame, Header};
use crate::writer::OutboundFrame;

/// Stateless codec between [`Message`] and [`Frame`].
///
/// # Example
///
/// ```
/// use chatwire::codec::{MessageCodec, SerializerKind};
/// use chatwire::message::Message;
/// use chatwire::protocol::FrameBuffer;
///
/// let codec = MessageCodec::new(SerializerKind::Binary);
/// let bytes = codec.encode_to_vec(&Message::chat("a", "b", "hi")).unwrap();
///
/// let frames = FrameBuffer::new().push(&bytes).unwrap();
/// let decoded = codec.decode(&frames[0]).unwrap();
/// assert_eq!(decoded, Message::chat("a", "b", "hi"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageCodec {
    serializer: SerializerKind,
}

impl MessageCodec {
    /// Create a codec writing payloads with `serializer`.
    pub fn new(serializer: SerializerKind) -> Self {
        Self { serializer }
    }

    /// Serializer used for outbound frames.
    #[inline]
    pub fn serializer(&self) -> SerializerKind {
        self.serializer
    }

    /// Serialize only the payload of a message.
    pub fn encode_payload(&self, message: &Message) -> Result<Vec<u8>> {
        let s = self.serializer;
        match message {
            Message::LoginRequest(body) => s.encode(body),
            Message::LoginResponse(body) => s.encode(body),
            Message::ChatRequest(body) => s.encode(body),
            Message::ChatResponse(body) => s.encode(body),
            Message::GroupCreateRequest(body) => s.encode(body),
            Message::GroupCreateResponse(body) => s.encode(body),
            Message::GroupJoinRequest(body) => s.encode(body),
            Message::GroupJoinResponse(body) => s.encode(body),
            Message::GroupQuitRequest(body) => s.encode(body),
            Message::GroupQuitResponse(body) => s.encode(body),
            Message::GroupChatRequest(body) => s.encode(body),
            Message::GroupChatResponse(body) => s.encode(body),
            Message::GroupMembersRequest(body) => s.encode(body),
            Message::GroupMembersResponse(body) => s.encode(body),
            Message::Ping | Message::Pong => Ok(Vec::new()),
            Message::RpcRequest(body) => s.encode(body),
            Message::RpcResponse(body) => s.encode(body),
        }
    }

    /// Build the header a message would be sent with.
    fn header_for(&self, message: &Message, payload_length: usize) -> Result<Header> {
        let payload_length = u32::try_from(payload_length).map_err(|_| {
            ChatwireError::Protocol(format!("payload of {} bytes is too large", payload_length))
        })?;
        Ok(Header::new(
            self.serializer.id(),
            message.kind().tag(),
            message.call_id(),
            payload_length,
        ))
    }

    /// Encode a message into a frame ready for the writer task.
    pub fn encode(&self, message: &Message) -> Result<OutboundFrame> {
        let payload = self.encode_payload(message)?;
        let header = self.header_for(message, payload.len())?;
        Ok(OutboundFrame::new(&header, Bytes::from(payload)))
    }

    /// Encode a message into one contiguous byte vector.
    pub fn encode_to_vec(&self, message: &Message) -> Result<Vec<u8>> {
        let payload = self.encode_payload(message)?;
        let header = self.header_for(message, payload.len())?;
        Ok(build_frame(&header, &payload))
    }

    /// Decode a complete frame into a message.
    ///
    /// # Errors
    ///
    /// - `UnknownKind` if the tag is not registered
    /// - `UnknownSerializer` if the serializer id is not known
    /// - a serializer error or `Protocol` if the payload is corrupt
    pub fn decode(&self, frame: &Frame) -> Result<Message> {
        let kind =
            MessageKind::from_tag(frame.kind()).ok_or(ChatwireError::UnknownKind(frame.kind()))?;
        let serializer = SerializerKind::from_id(frame.serializer())?;
        let payload = frame.payload();

        fn body<T: DeserializeOwned>(serializer: SerializerKind, payload: &[u8]) -> Result<T> {
            serializer.decode(payload)
        }

        let message = match kind {
            MessageKind::LoginRequest => Message::LoginRequest(body(serializer, payload)?),
            MessageKind::LoginResponse => Message::LoginResponse(body(serializer, payload)?),
            MessageKind::ChatRequest => Message::ChatRequest(body(serializer, payload)?),
            MessageKind::ChatResponse => Message::ChatResponse(body(serializer, payload)?),
            MessageKind::GroupCreateRequest => {
                Message::GroupCreateRequest(body(serializer, payload)?)
            }
            MessageKind::GroupCreateResponse => {
                Message::GroupCreateResponse(body(serializer, payload)?)
            }
            MessageKind::GroupJoinRequest => Message::GroupJoinRequest(body(serializer, payload)?),
            MessageKind::GroupJoinResponse => {
                Message::GroupJoinResponse(body(serializer, payload)?)
            }
            MessageKind::GroupQuitRequest => Message::GroupQuitRequest(body(serializer, payload)?),
            MessageKind::GroupQuitResponse => {
                Message::GroupQuitResponse(body(serializer, payload)?)
            }
            MessageKind::GroupChatRequest => Message::GroupChatRequest(body(serializer, payload)?),
            MessageKind::GroupChatResponse => {
                Message::GroupChatResponse(body(serializer, payload)?)
            }
            MessageKind::GroupMembersRequest => {
                Message::GroupMembersRequest(body(serializer, payload)?)
            }
            MessageKind::GroupMembersResponse => {
                Message::GroupMembersResponse(body(serializer, payload)?)
            }
            MessageKind::Ping | MessageKind::Pong => {
                if !payload.is_empty() {
                    return Err(ChatwireError::Protocol(format!(
                        "{:?} must not carry a payload ({} bytes)",
                        kind,
                        payload.len()
                    )));
                }
                if kind == MessageKind::Ping {
                    Message::Ping
                } else {
                    Message::Pong
                }
            }
            MessageKind::RpcRequest => {
                let mut request: crate::message::RpcRequest = body(serializer, payload)?;
                request.call_id = frame.call_id();
                Message::RpcRequest(request)
            }
            MessageKind::RpcResponse => {
                let mut response: crate::message::RpcResponse = body(serializer, payload)?;
                response.call_id = frame.call_id();
                Message::RpcResponse(response)
            }
        };

        Ok(message)
    }
}

//! Error types for chatwire.

use thiserror::Error;

/// Main error type for all chatwire operations.
#[derive(Debug, Error)]
pub enum ChatwireError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// The first four header bytes are not the protocol magic.
    #[error("Bad magic number: {0:02X?}")]
    BadMagic([u8; 4]),

    /// Header carries a protocol version we do not speak.
    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Declared payload length exceeds the configured cap.
    #[error("Payload size {size} exceeds maximum {max}")]
    PayloadTooLarge { size: u32, max: u32 },

    /// Kind tag is not in the message registry.
    #[error("Unknown message kind: {0}")]
    UnknownKind(u8),

    /// Serializer id is not one of the known strategies.
    #[error("Unknown serializer id: {0}")]
    UnknownSerializer(u8),

    /// Other protocol violation (trailing bytes, bad state, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The remote side of an RPC call raised an error.
    #[error("Remote call failed: {0}")]
    Remote(String),

    /// An RPC call did not complete before its deadline.
    #[error("RPC call {0} timed out")]
    RpcTimeout(i32),

    /// A call id was registered twice in the pending table.
    #[error("Call id {0} is already pending")]
    DuplicateCallId(i32),

    /// Connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Backpressure timeout - write buffer full.
    #[error("Backpressure timeout")]
    BackpressureTimeout,

    /// Operation requires a logged in session.
    #[error("Not logged in")]
    NotLoggedIn,

    /// Console input could not be parsed into a command.
    #[error("Invalid command: {0}")]
    Command(String),
}

impl ChatwireError {
    /// Whether this error must terminate the connection it happened on.
    ///
    /// Transport and decode faults are fatal; application level failures
    /// travel back to the peer as response messages instead.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ChatwireError::Io(_)
                | ChatwireError::Json(_)
                | ChatwireError::MsgPackDecode(_)
                | ChatwireError::BadMagic(_)
                | ChatwireError::UnsupportedVersion(_)
                | ChatwireError::PayloadTooLarge { .. }
                | ChatwireError::UnknownKind(_)
                | ChatwireError::UnknownSerializer(_)
                | ChatwireError::Protocol(_)
                | ChatwireError::ConnectionClosed
        )
    }
}

/// Result type alias using ChatwireError.
pub type Result<T> = std::result::Result<T, ChatwireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_faults_are_fatal() {
        assert!(ChatwireError::BadMagic([9, 9, 9, 9]).is_fatal());
        assert!(ChatwireError::UnknownKind(77).is_fatal());
        assert!(ChatwireError::PayloadTooLarge { size: 10, max: 5 }.is_fatal());
    }

    #[test]
    fn test_rpc_faults_are_not_fatal() {
        assert!(!ChatwireError::Remote("boom".to_string()).is_fatal());
        assert!(!ChatwireError::RpcTimeout(3).is_fatal());
        assert!(!ChatwireError::NotLoggedIn.is_fatal());
    }

    #[test]
    fn test_display_messages() {
        let err = ChatwireError::PayloadTooLarge { size: 200, max: 100 };
        assert_eq!(err.to_string(), "Payload size 200 exceeds maximum 100");
        assert_eq!(
            ChatwireError::BadMagic([0xCA, 0xFE, 0xBA, 0xBE]).to_string(),
            "Bad magic number: [CA, FE, BA, BE]"
        );
    }
}

//! Cheap, clonable handle to a live connection.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::codec::MessageCodec;
use crate::error::Result;
use crate::message::Message;
use crate::writer::WriterHandle;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of an accepted or dialed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Write side of a connection.
///
/// Holds the writer task handle, never the socket itself, so it can be
/// stored in the registry and cloned into any handler.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    writer: WriterHandle,
    codec: MessageCodec,
}

impl ConnectionHandle {
    /// Handle writing through `writer`, encoding with `codec`.
    pub fn new(id: ConnectionId, writer: WriterHandle, codec: MessageCodec) -> Self {
        Self { id, writer, codec }
    }

    #[inline]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Codec used for frames this side originates.
    #[inline]
    pub fn codec(&self) -> MessageCodec {
        self.codec
    }

    /// Writer task handle behind this connection.
    pub fn writer(&self) -> &WriterHandle {
        &self.writer
    }

    /// Encode a message and queue it on this connection.
    pub async fn send(&self, message: &Message) -> Result<()> {
        let frame = self.codec.encode(message)?;
        tracing::debug!("{} <- {:?}", self.id, message.kind());
        self.writer.send(frame).await
    }

    /// Whether the writer behind this handle has stopped.
    pub fn is_closed(&self) -> bool {
        self.writer.is_closed()
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("serializer", &self.codec.serializer())
            .field("pending", &self.writer.pending_count())
            .finish()
    }
}

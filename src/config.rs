//! Runtime settings for servers and clients.
//!
//! Both are normally filled in through [`ServerBuilder`](crate::ServerBuilder)
//! and [`ClientBuilder`](crate::ClientBuilder); the defaults below apply to
//! anything left unset.

use std::net::SocketAddr;
use std::time::Duration;

use crate::codec::SerializerKind;
use crate::protocol::DEFAULT_MAX_PAYLOAD_SIZE;
use crate::writer::WriterConfig;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8081;

/// Close a server connection that sent nothing for this long.
pub const DEFAULT_READ_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Ping from the client after writing nothing for this long.
pub const DEFAULT_WRITE_IDLE_INTERVAL: Duration = Duration::from_secs(3);

/// Give up on an RPC call after this long.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for a [`Server`](crate::Server).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on. Default: `0.0.0.0:8081`
    pub bind_addr: SocketAddr,
    /// `None` disables the idle watchdog.
    pub read_idle_timeout: Option<Duration>,
    /// Frames announcing a larger payload close the connection.
    pub max_payload_size: u32,
    /// Serializer for frames the server originates.
    pub serializer: SerializerKind,
    pub writer: WriterConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            read_idle_timeout: Some(DEFAULT_READ_IDLE_TIMEOUT),
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            serializer: SerializerKind::default(),
            writer: WriterConfig::default(),
        }
    }
}

/// Settings for a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `None` disables the ping heartbeat.
    pub write_idle_interval: Option<Duration>,
    /// `None` lets calls wait forever.
    pub rpc_timeout: Option<Duration>,
    pub max_payload_size: u32,
    pub serializer: SerializerKind,
    pub writer: WriterConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            write_idle_interval: Some(DEFAULT_WRITE_IDLE_INTERVAL),
            rpc_timeout: Some(DEFAULT_RPC_TIMEOUT),
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            serializer: SerializerKind::default(),
            writer: WriterConfig::default(),
        }
    }
}

//! Server builder and accept loop.
//!
//! The [`ServerBuilder`] collects configuration, the user store, RPC
//! services and handler overrides. The [`Server`] then:
//! 1. Accepts TCP connections
//! 2. Spawns one reader task and one writer task per connection
//! 3. Decodes frames and dispatches them to handlers in arrival order
//! 4. Closes idle or misbehaving connections and unbinds their session
//!
//! # Example
//!
//! ```no_run
//! use chatwire::Server;
//!
//! #[tokio::main]
//! async fn main() -> chatwire::error::Result<()> {
//!     let server = Server::builder()
//!         .bind_addr(([127, 0, 0, 1], 8081).into())
//!         .build()
//!         .await?;
//!
//!     server.run().await
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;

use crate::codec::{MessageCodec, SerializerKind};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::handler::{on_disconnect, ConnectionContext, HandlerRegistry, HandlerResult};
use crate::message::{Message, MessageKind};
use crate::protocol::FrameBuffer;
use crate::rpc::{HelloService, RpcService, ServiceTable};
use crate::session::{ConnectionHandle, ConnectionId, SessionRegistry};
use crate::transport::Listener;
use crate::user_store::{InMemoryUserStore, UserStore};
use crate::writer::spawn_writer_task;

/// Builder for configuring and creating a chat server.
pub struct ServerBuilder {
    config: ServerConfig,
    users: Arc<dyn UserStore>,
    services: ServiceTable,
    handlers: HandlerRegistry,
    registry: Arc<SessionRegistry>,
}

impl ServerBuilder {
    /// Builder with the demo user store and [`HelloService`] registered.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            users: Arc::new(InMemoryUserStore::default()),
            services: ServiceTable::new().with_service(HelloService::INTERFACE, HelloService),
            handlers: HandlerRegistry::server(),
            registry: Arc::new(SessionRegistry::new()),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Address to listen on.
    ///
    /// Default: 0.0.0.0:8081
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    /// Close connections that send nothing for this long (`None` disables).
    ///
    /// Default: 10 seconds
    pub fn read_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.read_idle_timeout = timeout;
        self
    }

    /// Reject frames announcing a larger payload.
    ///
    /// Default: 8 MiB
    pub fn max_payload_size(mut self, size: u32) -> Self {
        self.config.max_payload_size = size;
        self
    }

    /// Serializer for frames the server writes.
    ///
    /// Default: JSON
    pub fn serializer(mut self, serializer: SerializerKind) -> Self {
        self.config.serializer = serializer;
        self
    }

    /// Set the maximum pending frames per connection.
    ///
    /// Default: 1024
    pub fn max_pending_frames(mut self, limit: usize) -> Self {
        self.config.writer.max_pending_frames = limit;
        self
    }

    /// Set the backpressure timeout.
    ///
    /// Default: 5 seconds
    pub fn backpressure_timeout(mut self, timeout: Duration) -> Self {
        self.config.writer.backpressure_timeout = timeout;
        self
    }

    /// Authenticate logins against `users` instead of the built in accounts.
    pub fn user_store(mut self, users: impl UserStore) -> Self {
        self.users = Arc::new(users);
        self
    }

    /// Expose an RPC service under `interface_name`.
    pub fn service(mut self, interface_name: &str, service: impl RpcService) -> Self {
        self.services.register(interface_name, Arc::new(service));
        self
    }

    /// Override the handler for one message kind.
    pub fn handler<F, Fut>(mut self, kind: MessageKind, handler: F) -> Self
    where
        F: Fn(Message, ConnectionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handlers.register(kind, handler);
        self
    }

    /// Share an existing session registry.
    pub fn registry(mut self, registry: Arc<SessionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Bind the listening socket.
    pub async fn build(self) -> Result<Server> {
        let listener = Listener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        Ok(Server {
            listener,
            local_addr,
            shared: Arc::new(Shared {
                config: self.config,
                registry: self.registry,
                users: self.users,
                services: Arc::new(self.services),
                handlers: self.handlers,
            }),
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// State every connection task reads.
struct Shared {
    config: ServerConfig,
    registry: Arc<SessionRegistry>,
    users: Arc<dyn UserStore>,
    services: Arc<ServiceTable>,
    handlers: HandlerRegistry,
}

/// A bound chat server.
pub struct Server {
    listener: Listener,
    local_addr: SocketAddr,
    shared: Arc<Shared>,
}

impl Server {
    /// Create a new server builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The session registry shared by all connections.
    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.shared.registry.clone()
    }

    /// Accept connections forever.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` completes.
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        tracing::info!("listening on {}", self.local_addr);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("server on {} shutting down", self.local_addr);
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tokio::spawn(serve_connection(stream, peer, self.shared.clone()));
                    }
                    Err(e) => tracing::error!("accept failed: {}", e),
                }
            }
        }
    }
}

/// Why a connection's read loop ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closed {
    PeerClosed,
    Idle,
}

impl fmt::Display for Closed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Closed::PeerClosed => f.write_str("peer closed"),
            Closed::Idle => f.write_str("read idle"),
        }
    }
}

async fn serve_connection(stream: TcpStream, peer: SocketAddr, shared: Arc<Shared>) {
    let (mut reader, write_half) = stream.into_split();
    let (writer, writer_task) = spawn_writer_task(write_half, shared.config.writer.clone());

    let connection = ConnectionHandle::new(
        ConnectionId::next(),
        writer,
        MessageCodec::new(shared.config.serializer),
    );
    let ctx = ConnectionContext::new(
        connection,
        shared.registry.clone(),
        shared.users.clone(),
        shared.services.clone(),
    );
    tracing::info!("{}: accepted from {}", ctx.connection_id(), peer);

    let reason = match read_loop(&mut reader, &ctx, &shared).await {
        Ok(closed) => closed.to_string(),
        Err(e) => {
            tracing::warn!("{}: closing after error: {}", ctx.connection_id(), e);
            e.to_string()
        }
    };

    on_disconnect(&ctx, &reason);
    drop(ctx);

    // Flush responses already queued, then drop the write half to close
    let mut writer_task = writer_task;
    let flush = shared.config.writer.backpressure_timeout;
    if tokio::time::timeout(flush, &mut writer_task).await.is_err() {
        tracing::debug!("writer for {} did not drain in {:?}", peer, flush);
        writer_task.abort();
    }
}

/// Read frames until the peer leaves, goes idle, or violates the protocol.
async fn read_loop<R: AsyncRead + Unpin>(
    reader: &mut R,
    ctx: &ConnectionContext,
    shared: &Shared,
) -> Result<Closed> {
    let codec = ctx.connection().codec();
    let mut frame_buffer = FrameBuffer::with_max_payload(shared.config.max_payload_size);
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = match shared.config.read_idle_timeout {
            Some(idle) => match tokio::time::timeout(idle, reader.read(&mut buf)).await {
                Ok(read) => read?,
                Err(_) => return Ok(Closed::Idle),
            },
            None => reader.read(&mut buf).await?,
        };
        if n == 0 {
            return Ok(Closed::PeerClosed);
        }

        for frame in frame_buffer.push(&buf[..n])? {
            let message = codec.decode(&frame)?;
            if message.kind().is_heartbeat() {
                tracing::trace!("{} -> {:?}", ctx.connection_id(), message.kind());
            } else {
                tracing::debug!("{} -> {:?}", ctx.connection_id(), message.kind());
            }

            if let Err(e) = shared.handlers.dispatch(message, ctx.clone()).await {
                tracing::warn!("{}: handler error: {}", ctx.connection_id(), e);
            }
        }
        if let Some(fault) = frame_buffer.take_fault() {
            return Err(fault);
        }
    }
}

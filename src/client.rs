//! Client builder and runtime loop.
//!
//! The [`ClientBuilder`] provides a fluent API for configuring the
//! connection. The [`Client`] manages the lifecycle:
//! 1. Dial the server
//! 2. Spawn the writer task and the read loop
//! 3. Route RPC responses to their waiting callers, everything else to
//!    [`Client::next_message`]
//! 4. Ping the server whenever nothing was written for a while
//!
//! # Example
//!
//! ```no_run
//! use chatwire::Client;
//!
//! #[tokio::main]
//! async fn main() -> chatwire::error::Result<()> {
//!     let mut client = Client::builder().connect("127.0.0.1:8081").await?;
//!
//!     let status = client.login("zhangsan", "123").await?;
//!     assert!(status.success);
//!
//!     client.chat("lisi", "hello").await?;
//!     let greeting = client.hello_service().say_hello("zhangsan").await?;
//!     println!("{}", greeting);
//!
//!     client.close();
//!     Ok(())
//! }
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::ToSocketAddrs;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::codec::{MessageCodec, SerializerKind};
use crate::config::ClientConfig;
use crate::error::{ChatwireError, Result};
use crate::message::{Message, Status};
use crate::protocol::FrameBuffer;
use crate::rpc::{HelloServiceClient, MethodInvocation, PendingCalls, RpcCaller};
use crate::session::{ConnectionHandle, ConnectionId};
use crate::transport;
use crate::writer::spawn_writer_task;

/// Builder for configuring and connecting a client.
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Create a new client builder.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Ping after writing nothing for this long (`None` disables).
    ///
    /// Default: 3 seconds
    pub fn write_idle_interval(mut self, interval: Option<Duration>) -> Self {
        self.config.write_idle_interval = interval;
        self
    }

    /// Deadline for RPC calls (`None` waits forever).
    ///
    /// Default: 30 seconds
    pub fn rpc_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.rpc_timeout = timeout;
        self
    }

    /// Serializer for frames this client writes.
    ///
    /// Default: JSON
    pub fn serializer(mut self, serializer: SerializerKind) -> Self {
        self.config.serializer = serializer;
        self
    }

    /// Reject frames announcing a larger payload.
    ///
    /// Default: 8 MiB
    pub fn max_payload_size(mut self, size: u32) -> Self {
        self.config.max_payload_size = size;
        self
    }

    /// Set the maximum pending frames for backpressure.
    ///
    /// Default: 1024
    pub fn max_pending_frames(mut self, limit: usize) -> Self {
        self.config.writer.max_pending_frames = limit;
        self
    }

    /// Set the writer channel capacity.
    ///
    /// Default: 1024
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.writer.channel_capacity = capacity;
        self
    }

    /// Dial the server and start the background tasks.
    pub async fn connect(self, addr: impl ToSocketAddrs) -> Result<Client> {
        Client::start(addr, self.config).await
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A connected client.
pub struct Client {
    connection: ConnectionHandle,
    caller: RpcCaller,
    /// Unbounded so a slow reader never holds up RPC responses behind it.
    incoming: mpsc::UnboundedReceiver<Message>,
    /// Messages that arrived while waiting for a specific response.
    backlog: VecDeque<Message>,
    identity: Option<String>,
    reader_task: JoinHandle<()>,
    heartbeat_task: Option<JoinHandle<()>>,
    writer_task: JoinHandle<Result<()>>,
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Connect with default configuration.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        ClientBuilder::new().connect(addr).await
    }

    async fn start(addr: impl ToSocketAddrs, config: ClientConfig) -> Result<Self> {
        let stream = transport::connect(addr).await?;
        let peer = stream.peer_addr()?;
        let (reader, write_half) = stream.into_split();

        let (writer, writer_task) = spawn_writer_task(write_half, config.writer.clone());
        let connection = ConnectionHandle::new(
            ConnectionId::next(),
            writer,
            MessageCodec::new(config.serializer),
        );
        tracing::info!("{}: connected to {}", connection.id(), peer);

        let pending = Arc::new(PendingCalls::new());
        let caller = RpcCaller::new(connection.clone(), pending.clone(), config.rpc_timeout);

        let (incoming_tx, incoming) = mpsc::unbounded_channel();
        let id = connection.id();
        let max_payload_size = config.max_payload_size;
        let reader_task = tokio::spawn(async move {
            match read_loop(reader, max_payload_size, &pending, incoming_tx).await {
                Ok(()) => tracing::info!("{}: server closed the connection", id),
                Err(e) => tracing::warn!("{}: read loop ended: {}", id, e),
            }
            let failed = pending.fail_all(|| ChatwireError::ConnectionClosed);
            if failed > 0 {
                tracing::debug!("{}: failed {} pending calls", id, failed);
            }
        });

        let heartbeat_task = config
            .write_idle_interval
            .map(|interval| tokio::spawn(heartbeat(connection.clone(), interval)));

        Ok(Client {
            connection,
            caller,
            incoming,
            backlog: VecDeque::new(),
            identity: None,
            reader_task,
            heartbeat_task,
            writer_task,
        })
    }

    /// Identity of the last successful login.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    fn require_identity(&self) -> Result<&str> {
        self.identity().ok_or(ChatwireError::NotLoggedIn)
    }

    /// Log in and wait for the server's verdict.
    ///
    /// Messages that arrive before the verdict stay queued for
    /// [`Client::next_message`].
    pub async fn login(&mut self, username: &str, password: &str) -> Result<Status> {
        self.send(&Message::login(username, password)).await?;

        loop {
            match self.incoming.recv().await {
                Some(Message::LoginResponse(status)) => {
                    if status.success {
                        self.identity = Some(username.to_string());
                    }
                    return Ok(status);
                }
                Some(other) => self.backlog.push_back(other),
                None => return Err(ChatwireError::ConnectionClosed),
            }
        }
    }

    /// Queue any message on the connection.
    pub async fn send(&self, message: &Message) -> Result<()> {
        self.connection.send(message).await
    }

    /// Send a direct message from the logged in identity.
    pub async fn chat(&self, to: &str, content: &str) -> Result<()> {
        let from = self.require_identity()?;
        self.send(&Message::chat(from, to, content)).await
    }

    /// Send a message to every other online member of `group`.
    pub async fn group_chat(&self, group: &str, content: &str) -> Result<()> {
        let from = self.require_identity()?;
        self.send(&Message::group_chat(from, group, content)).await
    }

    /// Create a group; the logged in identity is always a member.
    pub async fn group_create<I, S>(&self, group: &str, members: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let me = self.require_identity()?;
        let members = members
            .into_iter()
            .map(Into::into)
            .chain(std::iter::once(me.to_string()));
        self.send(&Message::group_create(group, members)).await
    }

    /// Ask to join `group` as the logged in identity.
    pub async fn group_join(&self, group: &str) -> Result<()> {
        let me = self.require_identity()?;
        self.send(&Message::group_join(me, group)).await
    }

    /// Ask to leave `group`.
    pub async fn group_quit(&self, group: &str) -> Result<()> {
        let me = self.require_identity()?;
        self.send(&Message::group_quit(me, group)).await
    }

    /// Request the member list; the answer arrives via [`Client::next_message`].
    pub async fn group_members(&self, group: &str) -> Result<()> {
        self.send(&Message::group_members(group)).await
    }

    /// Invoke a remote method and wait for its result.
    pub async fn call(&self, invocation: MethodInvocation) -> Result<Value> {
        self.caller.call(invocation).await
    }

    /// Caller sharing this connection, for use from other tasks.
    pub fn rpc(&self) -> RpcCaller {
        self.caller.clone()
    }

    /// Typed stub for the server's `HelloService`.
    pub fn hello_service(&self) -> HelloServiceClient {
        HelloServiceClient::new(self.rpc())
    }

    /// Next message from the server that is not an RPC response.
    ///
    /// Returns `None` once the connection is closed.
    pub async fn next_message(&mut self) -> Option<Message> {
        if let Some(message) = self.backlog.pop_front() {
            return Some(message);
        }
        self.incoming.recv().await
    }

    /// Whether the read loop is still running.
    pub fn is_connected(&self) -> bool {
        !self.reader_task.is_finished()
    }

    /// Number of RPC calls waiting for a response.
    pub fn pending_calls(&self) -> usize {
        self.caller.pending().len()
    }

    /// Stop all background tasks and close the socket.
    pub fn close(self) {
        tracing::info!("{}: closing", self.connection.id());
        // Drop runs the cleanup
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(heartbeat) = &self.heartbeat_task {
            heartbeat.abort();
        }
        self.reader_task.abort();
        self.writer_task.abort();
        self.caller
            .pending()
            .fail_all(|| ChatwireError::ConnectionClosed);
    }
}

/// Read frames, completing RPC calls and forwarding everything else.
async fn read_loop<R: AsyncRead + Unpin>(
    mut reader: R,
    max_payload_size: u32,
    pending: &PendingCalls,
    incoming: mpsc::UnboundedSender<Message>,
) -> Result<()> {
    let codec = MessageCodec::default();
    let mut frame_buffer = FrameBuffer::with_max_payload(max_payload_size);
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }

        for frame in frame_buffer.push(&buf[..n])? {
            match codec.decode(&frame)? {
                Message::RpcResponse(response) => {
                    pending.complete(response);
                }
                message if message.kind().is_heartbeat() => {}
                message => {
                    // Receiver gone means nobody reads; keep serving RPC
                    let _ = incoming.send(message);
                }
            }
        }
        if let Some(fault) = frame_buffer.take_fault() {
            return Err(fault);
        }
    }
}

/// Send a ping whenever the connection has been write-idle for `interval`.
async fn heartbeat(connection: ConnectionHandle, interval: Duration) {
    loop {
        let idle = connection.writer().idle_for();
        if idle < interval {
            tokio::time::sleep(interval - idle).await;
            continue;
        }
        if let Err(e) = connection.send(&Message::Ping).await {
            tracing::debug!("{}: heartbeat stopped: {}", connection.id(), e);
            return;
        }
        tracing::trace!("{}: ping", connection.id());
    }
}

//! Connection context for handlers.
//!
//! Provides everything a handler may touch while processing one message:
//! - `respond` - send a message back on the connection it arrived on
//! - `send_to` - forward a message to another connection
//! - the shared session registry, user store and service table
//!
//! # Example
//!
//! ```ignore
//! async fn echo(message: Message, ctx: ConnectionContext) -> HandlerResult {
//!     ctx.respond(&message).await
//! }
//! ```

use std::sync::Arc;

use crate::error::Result;
use crate::message::Message;
use crate::rpc::ServiceTable;
use crate::session::{ConnectionHandle, ConnectionId, SessionRegistry};
use crate::user_store::UserStore;

/// Context passed to message handlers.
///
/// `ConnectionContext` is `Clone`; all shared state sits behind `Arc`s and
/// writes go through the connection's writer task.
#[derive(Clone)]
pub struct ConnectionContext {
    connection: ConnectionHandle,
    registry: Arc<SessionRegistry>,
    users: Arc<dyn UserStore>,
    services: Arc<ServiceTable>,
}

impl ConnectionContext {
    /// Context for one accepted connection.
    pub fn new(
        connection: ConnectionHandle,
        registry: Arc<SessionRegistry>,
        users: Arc<dyn UserStore>,
        services: Arc<ServiceTable>,
    ) -> Self {
        Self {
            connection,
            registry,
            users,
            services,
        }
    }

    /// The connection the message arrived on.
    #[inline]
    pub fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    #[inline]
    pub fn connection_id(&self) -> ConnectionId {
        self.connection.id()
    }

    /// Shared sessions and groups.
    #[inline]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Credential store used by login.
    #[inline]
    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    /// RPC services this server exposes.
    #[inline]
    pub fn services(&self) -> &ServiceTable {
        &self.services
    }

    /// Identity currently bound to this connection, if logged in.
    pub fn identity(&self) -> Option<String> {
        self.registry.identity_of(self.connection.id())
    }

    /// Send a message back to the peer of this connection.
    pub async fn respond(&self, message: &Message) -> Result<()> {
        self.connection.send(message).await
    }

    /// Send a message to another connection.
    pub async fn send_to(&self, target: &ConnectionHandle, message: &Message) -> Result<()> {
        target.send(message).await
    }
}

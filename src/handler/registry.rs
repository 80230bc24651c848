//! Handler registry for dispatching messages by kind.
//!
//! # Example
//!
//! ```
//! use chatwire::handler::HandlerRegistry;
//! use chatwire::message::MessageKind;
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register(MessageKind::Ping, |_message, _ctx| async { Ok(()) });
//!
//! assert!(registry.contains(MessageKind::Ping));
//! assert!(!registry.contains(MessageKind::Pong));
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use super::{chat, group, rpc, session, ConnectionContext};
use crate::error::{ChatwireError, Result};
use crate::message::{Message, MessageKind};

/// Result type for handler functions.
pub type HandlerResult = Result<()>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for message handlers.
pub trait Handler: Send + Sync + 'static {
    /// Handle one decoded message.
    fn call(&self, message: Message, ctx: ConnectionContext) -> BoxFuture<'static, HandlerResult>;
}

/// Adapter turning an async function into a [`Handler`].
pub struct FnHandler<F> {
    handler: F,
}

impl<F, Fut> FnHandler<F>
where
    F: Fn(Message, ConnectionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Message, ConnectionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, message: Message, ctx: ConnectionContext) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self.handler)(message, ctx))
    }
}

/// Registry mapping message kinds to handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<MessageKind, Box<dyn Handler>>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every server-side chat, group, heartbeat and RPC handler.
    pub fn server() -> Self {
        let mut registry = Self::new();
        registry.register(MessageKind::LoginRequest, session::login);
        registry.register(MessageKind::Ping, session::ping);
        registry.register(MessageKind::Pong, session::pong);
        registry.register(MessageKind::ChatRequest, chat::direct);
        registry.register(MessageKind::GroupChatRequest, chat::group);
        registry.register(MessageKind::GroupCreateRequest, group::create);
        registry.register(MessageKind::GroupJoinRequest, group::join);
        registry.register(MessageKind::GroupQuitRequest, group::quit);
        registry.register(MessageKind::GroupMembersRequest, group::members);
        registry.register(MessageKind::RpcRequest, rpc::invoke);
        registry
    }

    /// Register a handler function for `kind`, replacing any previous one.
    pub fn register<F, Fut>(&mut self, kind: MessageKind, handler: F)
    where
        F: Fn(Message, ConnectionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register_handler(kind, Box::new(FnHandler::new(handler)));
    }

    /// Register an already boxed handler, replacing any previous one.
    pub fn register_handler(&mut self, kind: MessageKind, handler: Box<dyn Handler>) {
        self.handlers.insert(kind, handler);
    }

    /// Handler for `kind`, if one is registered.
    pub fn get(&self, kind: MessageKind) -> Option<&dyn Handler> {
        self.handlers.get(&kind).map(|h| h.as_ref())
    }

    pub fn contains(&self, kind: MessageKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Run the handler registered for the message's kind.
    ///
    /// Kinds without a handler are logged and dropped.
    pub async fn dispatch(&self, message: Message, ctx: ConnectionContext) -> HandlerResult {
        let kind = message.kind();
        match self.get(kind) {
            Some(handler) => handler.call(message, ctx).await,
            None => {
                tracing::warn!("{}: no handler for {:?}, ignoring", ctx.connection_id(), kind);
                Ok(())
            }
        }
    }
}

/// Error for a handler invoked with a message it does not understand.
pub(crate) fn unexpected(kind: MessageKind) -> ChatwireError {
    ChatwireError::Protocol(format!("handler cannot process {:?}", kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test_support::TestPeer;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_server_registry_covers_requests() {
        let registry = HandlerRegistry::server();
        for kind in MessageKind::ALL {
            // Pong is accepted and ignored rather than logged as unhandled
            let expected = kind.is_request() || kind == MessageKind::Pong;
            assert_eq!(registry.contains(kind), expected, "{:?}", kind);
        }
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_kind() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();
        let counter = hits.clone();
        registry.register(MessageKind::ChatRequest, move |message, _ctx| {
            let counter = counter.clone();
            async move {
                assert_eq!(message.kind(), MessageKind::ChatRequest);
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let peer = TestPeer::new();
        registry
            .dispatch(Message::chat("a", "b", "c"), peer.ctx.clone())
            .await
            .unwrap();
        registry.dispatch(Message::Ping, peer.ctx.clone()).await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_error_is_returned() {
        let mut registry = HandlerRegistry::new();
        registry.register(MessageKind::Ping, |message: Message, _ctx| async move {
            Err(unexpected(message.kind()))
        });

        let peer = TestPeer::new();
        let result = registry.dispatch(Message::Ping, peer.ctx.clone()).await;
        assert!(matches!(result, Err(ChatwireError::Protocol(_))));
    }
}

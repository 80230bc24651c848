//! Handler module - per-kind message routing.
//!
//! Provides:
//! - [`HandlerRegistry`] - maps message kinds to handlers
//! - [`ConnectionContext`] - lets handlers reply, forward and consult shared state
//!
//! The server's read loop awaits each handler before decoding the next
//! frame, so messages from one connection are handled in arrival order.
//!
//! # Example
//!
//! ```ignore
//! use chatwire::handler::HandlerRegistry;
//! use chatwire::message::{Message, MessageKind};
//!
//! let mut registry = HandlerRegistry::server();
//!
//! // Echo direct messages back to their sender
//! registry.register(MessageKind::ChatRequest, |message, ctx| async move {
//!     ctx.respond(&message).await
//! });
//! ```

mod chat;
mod context;
mod group;
mod registry;
mod rpc;
mod session;

pub use context::ConnectionContext;
pub use registry::{BoxFuture, FnHandler, Handler, HandlerRegistry, HandlerResult};
pub use session::on_disconnect;

/// Reason strings carried by failure and notification responses.
pub mod reasons {
    pub const LOGIN_SUCCEEDED: &str = "login succeeded";
    pub const LOGIN_FAILED: &str = "incorrect username or password";
    /// Direct message recipient has no bound connection.
    pub const TARGET_OFFLINE: &str = "target not found or offline";
    pub const GROUP_EXISTS: &str = "group already exists";
    pub const NO_SUCH_GROUP: &str = "group does not exist";
    /// Chat and membership requests need a bound identity.
    pub const NOT_LOGGED_IN: &str = "not logged in";

    /// Sent to members who were added to a new group.
    pub fn added_to_group(group: &str) -> String {
        format!("you were added to group {}", group)
    }
}

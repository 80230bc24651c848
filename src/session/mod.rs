//! Session module - who is online and which groups exist.
//!
//! - [`ConnectionHandle`] - clonable write side of one connection
//! - [`SessionRegistry`] - identity bindings and group membership

mod connection;
mod registry;

pub use connection::{ConnectionHandle, ConnectionId};
pub use registry::SessionRegistry;

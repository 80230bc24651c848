//! # chatwire
//!
//! Chat and RPC over one length-delimited TCP wire protocol.
//!
//! Every frame is a 16-byte header (magic, version, serializer id, kind
//! tag, call id, padding, payload length) followed by a payload written
//! with MessagePack or JSON. On top of the framing sit:
//!
//! - a chat service: login, direct messages, named groups
//! - an RPC layer: call ids, a pending-call table and typed stubs
//! - heartbeats: the server drops read-idle peers, clients ping when idle
//!
//! ## Architecture
//!
//! - **Reader task** per connection: bytes → [`protocol::FrameBuffer`] →
//!   [`codec::MessageCodec`] → [`handler::HandlerRegistry`]
//! - **Writer task** per connection: any task holding a
//!   [`session::ConnectionHandle`] can queue frames on it
//! - **Shared state**: [`session::SessionRegistry`] on the server,
//!   [`rpc::PendingCalls`] on the client
//!
//! ## Example
//!
//! ```no_run
//! use chatwire::{Client, Server};
//!
//! #[tokio::main]
//! async fn main() -> chatwire::error::Result<()> {
//!     let server = Server::builder()
//!         .bind_addr(([127, 0, 0, 1], 0).into())
//!         .build()
//!         .await?;
//!     let addr = server.local_addr();
//!     tokio::spawn(server.run());
//!
//!     let mut client = Client::connect(addr).await?;
//!     client.login("zhangsan", "123").await?;
//!     let greeting = client.hello_service().say_hello("zhangsan").await?;
//!     assert_eq!(greeting, "hello, zhangsan");
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod console;
pub mod error;
pub mod handler;
pub mod message;
pub mod protocol;
pub mod rpc;
pub mod session;
pub mod transport;
pub mod user_store;
pub mod writer;

mod client;
mod server;

pub use client::{Client, ClientBuilder};
pub use error::ChatwireError;
pub use message::{Message, MessageKind};
pub use server::{Server, ServerBuilder};

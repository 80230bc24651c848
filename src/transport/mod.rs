//! Transport module - TCP sockets.
//!
//! Streams come out with `TCP_NODELAY` set; everything above this module
//! only sees `AsyncRead`/`AsyncWrite` halves.

mod tcp;

pub use tcp::{connect, Listener};

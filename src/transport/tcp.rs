//! TCP listener and dialer.
//!
//! # Example
//!
//! ```no_run
//! use chatwire::transport::{connect, Listener};
//!
//! # async fn demo() -> chatwire::error::Result<()> {
//! let listener = Listener::bind("127.0.0.1:0").await?;
//! let addr = listener.local_addr()?;
//! let client = connect(addr).await?;
//! let (server, peer) = listener.accept().await?;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

use crate::error::Result;

/// Listening socket that hands out configured streams.
pub struct Listener {
    listener: TcpListener,
}

impl Listener {
    /// Bind to `addr`. Port 0 picks a free port.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// Accept the next connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        let (stream, peer) = self.listener.accept().await?;
        configure(&stream)?;
        Ok((stream, peer))
    }

    /// Address actually bound, useful after binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

/// Dial a server.
pub async fn connect(addr: impl ToSocketAddrs) -> Result<TcpStream> {
    let stream = TcpStream::connect(addr).await?;
    configure(&stream)?;
    Ok(stream)
}

// Small frames dominate (pings, chat lines), so disable Nagle
fn configure(stream: &TcpStream) -> Result<()> {
    stream.set_nodelay(true)?;
    Ok(())
}

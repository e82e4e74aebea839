//! Transport abstraction.
//!
//! The core never touches sockets directly. Production plugs in tokio TCP,
//! the simulation harness plugs in turmoil's simulated TCP. Both hand back
//! plain byte streams; framing lives in [`crate::wire`].

use std::{future::Future, io};

use tokio::io::{AsyncRead, AsyncWrite};

use crate::peer::PeerAddr;

/// Stream-oriented network backend.
pub trait Transport: Clone + Send + Sync + 'static {
    /// Connected byte stream.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Bound listening socket.
    type Listener: Send + Sync + 'static;

    /// Bind a listener on `host:port`.
    fn bind(&self, host: &str, port: u16)
    -> impl Future<Output = io::Result<Self::Listener>> + Send;

    /// Port the listener actually bound.
    fn local_port(&self, listener: &Self::Listener) -> io::Result<u16>;

    /// Wait for the next inbound connection.
    ///
    /// Must be cancel-safe: the accept loop drops this future whenever its
    /// poll interval elapses.
    fn accept(&self, listener: &Self::Listener)
    -> impl Future<Output = io::Result<Self::Stream>> + Send;

    /// Open a connection to `peer`.
    fn connect(&self, peer: &PeerAddr) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

//! Turmoil TCP transport.

use std::{future::Future, io, net::Ipv4Addr};

use skewclock_core::{PeerAddr, Transport};
use turmoil::net::{TcpListener, TcpStream};

/// [`Transport`] over turmoil's simulated TCP.
///
/// Peers are dialled by turmoil host name. Every simulated host has a
/// single interface, so listeners always bind the unspecified address and
/// the configured listen host is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimTransport;

impl SimTransport {
    /// Create the transport.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Transport for SimTransport {
    type Stream = TcpStream;
    type Listener = TcpListener;

    fn bind(&self, _host: &str, port: u16) -> impl Future<Output = io::Result<TcpListener>> + Send {
        TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
    }

    fn local_port(&self, listener: &TcpListener) -> io::Result<u16> {
        Ok(listener.local_addr()?.port())
    }

    fn accept(&self, listener: &TcpListener) -> impl Future<Output = io::Result<TcpStream>> + Send {
        async move {
            let (stream, _) = listener.accept().await?;
            Ok(stream)
        }
    }

    fn connect(&self, peer: &PeerAddr) -> impl Future<Output = io::Result<TcpStream>> + Send {
        TcpStream::connect((peer.host.clone(), peer.port))
    }
}

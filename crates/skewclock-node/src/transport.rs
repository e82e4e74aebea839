//! Tokio TCP transport.

use std::{future::Future, io};

use skewclock_core::{PeerAddr, Transport};
use tokio::net::{TcpListener, TcpStream};

/// [`Transport`] over real TCP sockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTransport;

impl TokioTransport {
    /// Create the transport.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Transport for TokioTransport {
    type Stream = TcpStream;
    type Listener = TcpListener;

    fn bind(&self, host: &str, port: u16) -> impl Future<Output = io::Result<TcpListener>> + Send {
        let addr = (host.to_string(), port);
        async move { TcpListener::bind(addr).await }
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
        let addr = (peer.host.clone(), peer.port);
        async move {
            let stream = TcpStream::connect(addr).await?;
            stream.set_nodelay(true)?;
            Ok(stream)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use skewclock_core::{PeerLink, SendFailure, SendOutcome, TransportLink};
    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn bind_ephemeral_port() {
        let transport = TokioTransport::new();
        let listener = transport.bind("127.0.0.1", 0).await.unwrap();
        assert_ne!(transport.local_port(&listener).unwrap(), 0);
    }

    #[tokio::test]
    async fn link_delivers_over_tcp() {
        let transport = TokioTransport::new();
        let listener = transport.bind("127.0.0.1", 0).await.unwrap();
        let port = transport.local_port(&listener).unwrap();
        let peer = PeerAddr { id: 1, host: "127.0.0.1".to_string(), port };

        let link = TransportLink::new(transport, Duration::from_secs(1));
        let (outcome, stream) = tokio::join!(link.send(&peer, 12), transport.accept(&listener));
        assert!(outcome.is_delivered());

        let mut received = String::new();
        stream.unwrap().read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "12");
    }

    #[tokio::test]
    async fn link_to_closed_port_fails_quietly() {
        let transport = TokioTransport::new();
        // grab a free port, then release it
        let port = {
            let listener = transport.bind("127.0.0.1", 0).await.unwrap();
            transport.local_port(&listener).unwrap()
        };
        let peer = PeerAddr { id: 9, host: "127.0.0.1".to_string(), port };

        let link = TransportLink::new(transport, Duration::from_secs(1));
        match link.send(&peer, 1).await {
            SendOutcome::Failed(SendFailure::Connect(_) | SendFailure::TimedOut(_)) => {},
            other => panic!("expected a quiet failure, got {other:?}"),
        }
    }
}

//! Best-effort peer link.
//!
//! A send opens a fresh connection, writes one clock value and closes. Any
//! failure is reported as [`SendOutcome::Failed`] and then ignored by the
//! scheduler: there is no acknowledgment, no retry, and a lost message stays
//! lost.

use std::{future::Future, io, time::Duration};

use tokio::io::AsyncWriteExt;

use crate::{peer::PeerAddr, transport::Transport, wire};

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Value was written and the connection closed cleanly.
    Delivered,
    /// Value was not delivered.
    Failed(SendFailure),
}

impl SendOutcome {
    /// True if the value reached the peer's socket.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Why a delivery attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendFailure {
    /// Peer refused or was unreachable.
    #[error("connect failed: {0}")]
    Connect(io::ErrorKind),

    /// Connection broke while writing or closing.
    #[error("write failed: {0}")]
    Write(io::ErrorKind),

    /// Connect, write and close did not finish in time.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// One-shot sender of clock values.
pub trait PeerLink: Send + Sync + 'static {
    /// Attempt to deliver `value` to `peer`.
    ///
    /// Never errors and never blocks beyond the link's timeout.
    fn send(&self, peer: &PeerAddr, value: u64) -> impl Future<Output = SendOutcome> + Send;
}

/// [`PeerLink`] over any [`Transport`], bounded by a timeout.
#[derive(Debug, Clone)]
pub struct TransportLink<T> {
    transport: T,
    timeout: Duration,
}

impl<T: Transport> TransportLink<T> {
    /// Link whose sends give up after `timeout`.
    pub fn new(transport: T, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Upper bound on one send.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl<T: Transport> PeerLink for TransportLink<T> {
    fn send(&self, peer: &PeerAddr, value: u64) -> impl Future<Output = SendOutcome> + Send {
        let connect = self.transport.connect(peer);
        let timeout = self.timeout;

        async move {
            match tokio::time::timeout(timeout, deliver(connect, value)).await {
                Ok(Ok(())) => SendOutcome::Delivered,
                Ok(Err(failure)) => SendOutcome::Failed(failure),
                Err(_) => SendOutcome::Failed(SendFailure::TimedOut(timeout)),
            }
        }
    }
}

async fn deliver<S>(
    connect: impl Future<Output = io::Result<S>>,
    value: u64,
) -> Result<(), SendFailure>
where
    S: tokio::io::AsyncWrite + Unpin,
{
    let mut stream = connect.await.map_err(|e| SendFailure::Connect(e.kind()))?;
    let payload = wire::encode_clock(value);
    stream.write_all(&payload).await.map_err(|e| SendFailure::Write(e.kind()))?;
    stream.shutdown().await.map_err(|e| SendFailure::Write(e.kind()))?;
    Ok(())
}

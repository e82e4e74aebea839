//! Inbound listener.
//!
//! Accepts connections for the machine's lifetime and hands each one to a
//! short-lived task that reads one payload, decodes it, and pushes the value
//! to the inbox. The accept call is wrapped in a poll timeout so the loop
//! notices a cleared running flag within one interval.

use std::{io, time::Duration};

use tokio::io::AsyncRead;

use crate::{
    config::MachineConfig,
    error::MachineError,
    inbox::Inbox,
    lifecycle::Lifecycle,
    peer::MachineId,
    transport::Transport,
    wire::{self, WireError},
};

/// Pause after a failed accept so a persistent error does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Why one inbound connection produced no value.
#[derive(Debug, thiserror::Error)]
pub enum InboundError {
    /// Reading the payload failed.
    #[error("read failed: {0}")]
    Read(#[from] io::Error),

    /// Sender did not finish within the read timeout.
    #[error("read timed out after {0:?}")]
    TimedOut(Duration),

    /// Payload was not a clock value.
    #[error("malformed payload: {0}")]
    Malformed(#[from] WireError),
}

/// Bound listener for one machine.
pub struct Listener<T: Transport> {
    id: MachineId,
    transport: T,
    socket: T::Listener,
    port: u16,
    inbox: Inbox,
    lifecycle: Lifecycle,
    poll_interval: Duration,
    read_timeout: Duration,
}

impl<T: Transport> Listener<T> {
    /// Bind the machine's listening address.
    ///
    /// This is the only fallible step of starting a machine that touches
    /// the network.
    pub async fn bind(
        transport: T,
        config: &MachineConfig,
        inbox: Inbox,
        lifecycle: Lifecycle,
    ) -> Result<Self, MachineError> {
        let bind_error = |source| MachineError::Bind {
            host: config.listen_host.clone(),
            port: config.listen_port,
            source,
        };

        let socket =
            transport.bind(&config.listen_host, config.listen_port).await.map_err(bind_error)?;
        let port = transport.local_port(&socket).map_err(bind_error)?;

        Ok(Self {
            id: config.id,
            transport,
            socket,
            port,
            inbox,
            lifecycle,
            poll_interval: config.accept_poll_interval,
            read_timeout: config.read_timeout,
        })
    }

    /// Port actually bound.
    pub fn local_port(&self) -> u16 {
        self.port
    }

    /// Accept until the running flag clears, then drop the socket.
    pub async fn run(self) {
        tracing::debug!(machine = self.id, port = self.port, "listener started");

        while self.lifecycle.is_running() {
            let accepted =
                tokio::time::timeout(self.poll_interval, self.transport.accept(&self.socket)).await;

            match accepted {
                // poll interval elapsed, re-check the flag
                Err(_) => {},
                Ok(Ok(stream)) => self.spawn_handler(stream),
                Ok(Err(e)) => {
                    if self.lifecycle.is_running() {
                        tracing::warn!(machine = self.id, error = %e, "accept failed");
                    }
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                },
            }
        }

        tracing::debug!(machine = self.id, "listener stopped");
    }

    fn spawn_handler(&self, stream: T::Stream) {
        let id = self.id;
        let inbox = self.inbox.clone();
        let read_timeout = self.read_timeout;

        // result is observed through the inbox only
        drop(tokio::spawn(async move {
            match receive_one(stream, read_timeout).await {
                Ok(value) => {
                    inbox.push(value);
                    tracing::trace!(machine = id, value, "message queued");
                },
                Err(e) => tracing::warn!(machine = id, error = %e, "dropped inbound message"),
            }
        }));
    }
}

/// Read and decode exactly one clock value from `stream`.
pub async fn receive_one<S>(mut stream: S, read_timeout: Duration) -> Result<u64, InboundError>
where
    S: AsyncRead + Unpin,
{
    let payload = tokio::time::timeout(read_timeout, wire::read_payload(&mut stream))
        .await
        .map_err(|_| InboundError::TimedOut(read_timeout))??;

    Ok(wire::decode_clock(&payload)?)
}

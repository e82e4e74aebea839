//! Machine construction and lifecycle errors.

use crate::peer::MachineId;

/// Errors that can occur when starting or joining a machine.
///
/// Nothing that happens during a tick is an error; only construction and
/// teardown can fail.
#[derive(Debug, thiserror::Error)]
pub enum MachineError {
    /// Listening address could not be bound.
    #[error("failed to bind {host}:{port}: {source}")]
    Bind {
        /// Host the listener tried to bind.
        host: String,
        /// Port the listener tried to bind.
        port: u16,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Clock rate outside `1..=6` ticks per second.
    #[error("invalid clock rate {0}: must be between 1 and 6 ticks per second")]
    InvalidClockRate(u32),

    /// Peer list contains the machine itself.
    #[error("peer list of vm{0} contains itself")]
    SelfPeer(MachineId),

    /// Peer list contains the same machine twice.
    #[error("peer list contains vm{0} more than once")]
    DuplicatePeer(MachineId),

    /// A machine task panicked or was cancelled.
    #[error("machine task failed: {0}")]
    Task(String),
}

//! Node error types.

use std::path::PathBuf;

use skewclock_core::MachineError;

/// Errors that can occur while running a cluster.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// Invalid cluster configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Log file could not be created
    #[error("failed to create log file {path}: {source}")]
    LogFile {
        /// File the sink tried to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Machine failed to start or join
    #[error("machine error: {0}")]
    Machine(#[from] MachineError),

    /// Other I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

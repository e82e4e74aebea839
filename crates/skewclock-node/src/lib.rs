//! Skewclock node.
//!
//! Production runtime for skewclock machines: real time and OS entropy
//! ([`SystemEnv`]), tokio TCP ([`TokioTransport`]), per-machine text log files
//! ([`TextLogSink`]) and [`Cluster`] orchestration for a fully meshed set of
//! machines on one host.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cluster;
pub mod error;
pub mod log_sink;
pub mod system_env;
pub mod transport;

pub use cluster::{Cluster, ClusterConfig, MachineSummary, run_simulation};
pub use error::NodeError;
pub use log_sink::TextLogSink;
pub use system_env::SystemEnv;
pub use transport::TokioTransport;

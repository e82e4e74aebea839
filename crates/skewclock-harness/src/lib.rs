//! Deterministic simulation harness for skewclock machines.
//!
//! This crate provides Turmoil-based implementations of the `Environment`
//! and `Transport` traits, plus a [`Scenario`] builder that runs a whole
//! cluster in virtual time and hands back every machine's records.
//!
//! # Why Deterministic Simulation?
//!
//! A real cluster run depends on OS scheduling, socket timing and entropy,
//! so two runs never produce the same logs. Under turmoil:
//!
//! - **Reproducibility**: the same seed replays the same ticks, draws and
//!   deliveries
//! - **Fault injection**: message loss, latency and partitions are one
//!   builder call away
//! - **Fast execution**: a minute of cluster time runs in milliseconds
//!
//! # Example
//!
//! ```rust,ignore
//! use skewclock_harness::{Scenario, oracle};
//!
//! let outcome = Scenario::new(42).with_fail_rate(0.1).run()?;
//! oracle::check_receives_were_sent(&outcome)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod oracle;
pub mod scenario;
mod sim_env;
mod sim_transport;

pub use scenario::{MachineRun, MachineSpec, SIM_PORT, Scenario, ScenarioOutcome, host_name, mesh_config};
pub use sim_env::{SIM_EPOCH_SECS, SimEnv};
pub use sim_transport::SimTransport;

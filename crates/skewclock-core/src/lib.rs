//! Skewclock core.
//!
//! One simulated machine: an inbox fed by a listener, a Lamport clock, and a
//! tick scheduler running at its own rate. Machines talk only through
//! one-shot, best-effort sends of their clock value.
//!
//! ## Architecture
//!
//! ```text
//! Machine
//!   ├─ Listener     (accept loop, one task per inbound connection)
//!   │    └─ Inbox   (FIFO of received clock values)
//!   ├─ TickDriver   (sleeps, performs sends, emits records)
//!   │    ├─ Scheduler     (one clock mutation per tick, no I/O)
//!   │    │    └─ LamportClock
//!   │    ├─ PeerLink      (fire-and-forget delivery)
//!   │    └─ EventSink     (receives one EventRecord per tick)
//!   └─ Lifecycle    (running flag shared by both loops)
//! ```
//!
//! Time, randomness and sockets come in through the [`Environment`] and
//! [`Transport`] traits, so the same code runs on tokio in production and on
//! turmoil in deterministic simulation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod env;
pub mod error;
pub mod event;
pub mod inbox;
pub mod lifecycle;
pub mod link;
pub mod listener;
pub mod machine;
pub mod outcome;
pub mod peer;
pub mod scheduler;
pub mod sink;
pub mod transport;
pub mod wire;

pub use clock::LamportClock;
pub use config::{ClockRate, MachineConfig};
pub use env::Environment;
pub use error::MachineError;
pub use event::{EventKind, EventRecord, MachineInfo};
pub use inbox::Inbox;
pub use lifecycle::Lifecycle;
pub use link::{PeerLink, SendFailure, SendOutcome, TransportLink};
pub use listener::{InboundError, Listener};
pub use machine::Machine;
pub use outcome::EventOutcome;
pub use peer::{MachineId, PeerAddr, PeerList};
pub use scheduler::{Delivery, Scheduler, SchedulerState, TickDriver, TickPlan};
pub use sink::{EventSink, MemorySink};
pub use transport::Transport;
pub use wire::WireError;

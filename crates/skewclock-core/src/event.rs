//! Per-tick event records handed to the event sink.

use std::time::SystemTime;

use crate::{config::ClockRate, peer::MachineId};

/// What a machine did during one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Popped a message from the inbox.
    Receive {
        /// Logical time carried by the message.
        value: u64,
    },
    /// Generated a send event.
    ///
    /// `recipients` is empty when the addressed peer does not exist.
    Send {
        /// Peer ids the value was handed to, in positional order.
        recipients: Vec<MachineId>,
    },
    /// Generated an internal event.
    Internal,
}

impl EventKind {
    /// Short lowercase label (`receive`, `send`, `internal`).
    pub fn label(&self) -> &'static str {
        match self {
            Self::Receive { .. } => "receive",
            Self::Send { .. } => "send",
            Self::Internal => "internal",
        }
    }
}

/// Immutable description of one tick.
///
/// # Invariants
///
/// - `clock` is the value returned by the clock mutation made in this tick
/// - exactly one record exists per executed tick, in tick order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// 1-based tick number within this machine.
    pub tick: u64,
    /// What happened.
    pub kind: EventKind,
    /// Wall-clock time at emission.
    pub timestamp: SystemTime,
    /// Logical clock right after this tick's mutation.
    pub clock: u64,
    /// Inbox length at emission (after the pop for receive events).
    pub queue_len: usize,
}

impl EventRecord {
    /// Value carried by a received message.
    pub fn received_value(&self) -> Option<u64> {
        match self.kind {
            EventKind::Receive { value } => Some(value),
            _ => None,
        }
    }

    /// Recipients of a send event.
    pub fn recipients(&self) -> Option<&[MachineId]> {
        match &self.kind {
            EventKind::Send { recipients } => Some(recipients),
            _ => None,
        }
    }
}

/// Machine metadata reported to the sink once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineInfo {
    /// Machine id.
    pub id: MachineId,
    /// Ticks per second.
    pub clock_rate: ClockRate,
    /// Peer ids in positional order.
    pub peers: Vec<MachineId>,
    /// Port the listener is bound to.
    pub listen_port: u16,
}

//! Machine configuration.

use std::time::Duration;

use crate::{
    env::Environment,
    error::MachineError,
    peer::{MachineId, PeerList},
};

/// Ticks per second, fixed for a machine's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockRate(u32);

impl ClockRate {
    /// Slowest allowed rate.
    pub const MIN: u32 = 1;
    /// Fastest allowed rate.
    pub const MAX: u32 = 6;

    /// Validate a rate in ticks per second.
    pub fn new(ticks_per_second: u32) -> Result<Self, MachineError> {
        if (Self::MIN..=Self::MAX).contains(&ticks_per_second) {
            Ok(Self(ticks_per_second))
        } else {
            Err(MachineError::InvalidClockRate(ticks_per_second))
        }
    }

    /// Draw a rate uniformly from `1..=6`.
    pub fn draw<E: Environment>(env: &E) -> Self {
        Self(env.random_in(Self::MIN..=Self::MAX))
    }

    /// Ticks per second.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Nominal duration of one tick.
    pub fn tick_budget(self) -> Duration {
        Duration::from_secs(1) / self.0
    }
}

impl TryFrom<u32> for ClockRate {
    type Error = MachineError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Configuration for one machine.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// This machine's id.
    pub id: MachineId,
    /// Host to bind the listener on.
    pub listen_host: String,
    /// Port to bind the listener on.
    pub listen_port: u16,
    /// Peers in positional order.
    pub peers: PeerList,
    /// Fixed clock rate, or `None` to draw one from the environment.
    pub clock_rate: Option<ClockRate>,
    /// Upper bound on one peer send (connect, write and close).
    pub send_timeout: Duration,
    /// How often the accept loop wakes up to check for shutdown.
    pub accept_poll_interval: Duration,
    /// Upper bound on reading one inbound payload.
    pub read_timeout: Duration,
    /// Pause before the first tick so the other machines can bind.
    pub startup_delay: Duration,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            id: 0,
            listen_host: "127.0.0.1".to_string(),
            listen_port: 5000,
            peers: PeerList::default(),
            clock_rate: None,
            send_timeout: Duration::from_secs(1),
            accept_poll_interval: Duration::from_secs(1),
            read_timeout: Duration::from_secs(1),
            startup_delay: Duration::from_secs(1),
        }
    }
}

impl MachineConfig {
    /// Config for machine `id` in a fully connected cluster of `size`
    /// machines listening on `base_port + id`.
    pub fn cluster_member(id: MachineId, size: u16, host: &str, base_port: u16) -> Self {
        Self {
            id,
            listen_host: host.to_string(),
            listen_port: base_port.saturating_add(id),
            peers: PeerList::full_mesh(id, size, host, base_port),
            ..Self::default()
        }
    }

    /// Check the peer list for self-references and duplicates.
    pub fn validate(&self) -> Result<(), MachineError> {
        if self.peers.iter().any(|p| p.id == self.id) {
            return Err(MachineError::SelfPeer(self.id));
        }
        if let Some(dup) = self.peers.first_duplicate() {
            return Err(MachineError::DuplicatePeer(dup));
        }
        Ok(())
    }
}

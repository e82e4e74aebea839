//! Event-generation outcomes for ticks with an empty inbox.
//!
//! One uniform draw in `1..=10` decides the tick:
//!
//! ```text
//! 1      -> SendOne(0)   first peer
//! 2      -> SendOne(1)   second peer
//! 3      -> SendAll      every peer
//! 4..=10 -> Internal
//! ```

use std::ops::RangeInclusive;

use crate::{env::Environment, peer::PeerList};

/// Range of the per-tick draw.
pub const DRAW_RANGE: RangeInclusive<u32> = 1..=10;

/// Local event chosen for a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// No network I/O.
    Internal,
    /// Send to the peer at this position.
    SendOne(usize),
    /// Send to every peer.
    SendAll,
}

impl EventOutcome {
    /// Map a draw to an outcome.
    ///
    /// Values outside `1..=10` are treated as internal events.
    pub fn from_draw(draw: u32) -> Self {
        match draw {
            1 => Self::SendOne(0),
            2 => Self::SendOne(1),
            3 => Self::SendAll,
            _ => Self::Internal,
        }
    }

    /// Draw an outcome from the environment's RNG.
    pub fn draw<E: Environment>(env: &E) -> Self {
        Self::from_draw(env.random_in(DRAW_RANGE))
    }

    /// True for both send variants.
    pub fn is_send(self) -> bool {
        !matches!(self, Self::Internal)
    }

    /// Peer positions this outcome addresses in `peers`.
    ///
    /// A missing positional peer yields no targets; the event still counts
    /// as a send.
    pub fn targets(self, peers: &PeerList) -> Vec<usize> {
        match self {
            Self::Internal => Vec::new(),
            Self::SendOne(index) if index < peers.len() => vec![index],
            Self::SendOne(_) => Vec::new(),
            Self::SendAll => (0..peers.len()).collect(),
        }
    }
}

//! Lamport logical clock engine.
//!
//! # Invariants
//!
//! - Monotonicity: every operation returns a value strictly greater than the
//!   clock before it (saturating at `u64::MAX`)
//! - Exclusivity: each read-modify-write happens under the lock and the lock
//!   is never held across I/O
//! - Receive rule: `on_receive(v)` yields `max(current, v) + 1`
//! - Local rule: `on_send()` and `on_internal()` yield `current + 1`

use std::sync::{Arc, Mutex, PoisonError};

/// Shared handle to one machine's logical clock.
///
/// Cloning yields another handle to the same clock, so observers (tests, the
/// machine's public accessors) can read it while the scheduler mutates it.
#[derive(Debug, Clone, Default)]
pub struct LamportClock {
    value: Arc<Mutex<u64>>,
}

impl LamportClock {
    /// Clock starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock starting at `value`.
    pub fn starting_at(value: u64) -> Self {
        Self { value: Arc::new(Mutex::new(value)) }
    }

    /// Current value.
    pub fn current(&self) -> u64 {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply the receive rule and return the new value.
    pub fn on_receive(&self, received: u64) -> u64 {
        self.update(|current| current.max(received).saturating_add(1))
    }

    /// Advance for a send event and return the new value.
    pub fn on_send(&self) -> u64 {
        self.tick()
    }

    /// Advance for an internal event and return the new value.
    pub fn on_internal(&self) -> u64 {
        self.tick()
    }

    fn tick(&self) -> u64 {
        self.update(|current| current.saturating_add(1))
    }

    fn update(&self, f: impl FnOnce(u64) -> u64) -> u64 {
        let mut guard = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = f(*guard);
        *guard
    }
}

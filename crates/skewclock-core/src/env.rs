//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples the machine loop from system resources
//! (monotonic time, wall-clock time, randomness, sleeping). This enables:
//!
//! - Deterministic Simulation: turmoil drives tokio's virtual clock and the
//!   harness supplies a seeded RNG with optional scripted draws, so a run with
//!   the same seed replays the same sequence of ticks.
//!
//! - Production Runtime: the node crate plugs in system time, tokio sleeps and
//!   OS entropy without any change to the scheduler.
//!
//! # Invariants
//!
//! - Monotonicity: `env.now()` must never go backwards
//! - Determinism: Given the same seed, `random_bytes()` produces the same
//!   sequence
//! - Isolation: Implementations must not share global state between machines

use std::{
    fmt::Debug,
    ops::{RangeInclusive, Sub},
    time::{Duration, SystemTime},
};

/// Abstract environment providing time, randomness, and async sleeping.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Monotonic instant type used to measure tick processing time.
    type Instant: Copy + Ord + Debug + Send + Sync + Sub<Output = Duration> + 'static;

    /// Returns the current monotonic time.
    ///
    /// # Invariants
    ///
    /// - Monotonicity: subsequent calls return values `>=` previous calls.
    fn now(&self) -> Self::Instant;

    /// Returns the wall-clock time stamped onto event records.
    ///
    /// Unlike `now()`, this may jump; it is diagnostic only and never used
    /// for ordering.
    fn wall_clock(&self) -> SystemTime;

    /// Sleeps for the specified duration.
    ///
    /// Only the tick driver sleeps. Protocol logic never does.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Draws an integer uniformly from `range`.
    ///
    /// Used for the per-tick event draw (`1..=10`) and the clock-rate draw
    /// (`1..=6`). The modulo bias over a 64-bit source is negligible for
    /// spans this small.
    fn random_in(&self, range: RangeInclusive<u32>) -> u32 {
        let (low, high) = range.into_inner();
        if high <= low {
            return low;
        }
        let span = u64::from(high - low) + 1;
        let offset = self.random_u64() % span;
        // offset < span <= u32::MAX + 1, so it fits
        low + u32::try_from(offset).unwrap_or(0)
    }
}

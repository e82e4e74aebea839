//! Real-time environment for cluster runs.
//!
//! Ticks are paced by the OS monotonic clock and tokio's timer, records are
//! stamped with the system wall clock, and clock-rate and event draws come
//! from OS entropy.

use std::time::{Duration, Instant, SystemTime};

use skewclock_core::Environment;

/// [`Environment`] backed by the host machine.
///
/// Two machines in the same process share nothing: each draw goes straight
/// to `getrandom`, so rates and event sequences are independent.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create the environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_clock(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        if let Err(e) = getrandom::fill(buffer) {
            // every draw collapses to the low end of its range
            tracing::error!(error = %e, "entropy source failed, using zeroed draws");
            buffer.fill(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_clock_advances() {
        let env = SystemEnv::new();
        let before = env.now();
        std::thread::sleep(Duration::from_millis(5));
        assert!(env.now() > before);
    }

    #[test]
    fn wall_clock_is_after_epoch() {
        assert!(SystemEnv::new().wall_clock() > SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn rate_draws_stay_in_bounds() {
        let env = SystemEnv::new();
        for _ in 0..500 {
            let rate = skewclock_core::ClockRate::draw(&env).get();
            assert!((1..=6).contains(&rate), "rate {rate} out of range");
        }
    }

    #[test]
    fn event_draws_cover_whole_range() {
        let env = SystemEnv::new();
        let mut seen = [false; 10];
        for _ in 0..2_000 {
            seen[(env.random_in(1..=10) - 1) as usize] = true;
        }
        assert!(seen.iter().all(|s| *s), "missing draws: {seen:?}");
    }

    #[tokio::test]
    async fn sleep_waits_at_least_requested() {
        let env = SystemEnv::new();
        let before = env.now();
        env.sleep(Duration::from_millis(30)).await;
        assert!(env.now() - before >= Duration::from_millis(30));
    }
}

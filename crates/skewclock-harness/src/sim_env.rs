//! Simulated environment: virtual time and seeded, optionally scripted,
//! randomness.

use std::{
    collections::VecDeque,
    ops::RangeInclusive,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, SystemTime},
};

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skewclock_core::Environment;

/// Wall-clock origin of every simulation (2023-11-14T22:13:20Z).
pub const SIM_EPOCH_SECS: u64 = 1_700_000_000;

#[derive(Debug)]
struct Draws {
    rng: ChaCha8Rng,
    script: VecDeque<u32>,
    fixed: Option<u32>,
}

/// [`Environment`] for turmoil simulations.
///
/// Time comes from tokio's clock, which turmoil drives virtually. Wall-clock
/// timestamps are derived from the simulation's elapsed time, so records are
/// reproducible too.
///
/// Draws come from a ChaCha8 RNG seeded at construction. A script or a fixed
/// draw overrides `random_in` so scenarios can force specific tick outcomes.
/// Clones share the same RNG.
#[derive(Debug, Clone)]
pub struct SimEnv {
    draws: Arc<Mutex<Draws>>,
}

impl SimEnv {
    /// Environment drawing from a ChaCha8 RNG seeded with `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            draws: Arc::new(Mutex::new(Draws {
                rng: ChaCha8Rng::seed_from_u64(seed),
                script: VecDeque::new(),
                fixed: None,
            })),
        }
    }

    /// Serve `draws` to `random_in`, in order, before falling back to the
    /// RNG (or the fixed draw, if set).
    #[must_use]
    pub fn with_script(self, draws: impl IntoIterator<Item = u32>) -> Self {
        self.lock().script.extend(draws);
        self
    }

    /// Answer every unscripted `random_in` call with `draw`.
    #[must_use]
    pub fn with_fixed_draw(self, draw: u32) -> Self {
        self.lock().fixed = Some(draw);
        self
    }

    /// Scripted draws not consumed yet.
    pub fn script_remaining(&self) -> usize {
        self.lock().script.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Draws> {
        self.draws.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Environment for SimEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn wall_clock(&self) -> SystemTime {
        let elapsed = turmoil::sim_elapsed().unwrap_or_default();
        SystemTime::UNIX_EPOCH + Duration::from_secs(SIM_EPOCH_SECS) + elapsed
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.lock().rng.fill_bytes(buffer);
    }

    fn random_in(&self, range: RangeInclusive<u32>) -> u32 {
        let (low, high) = range.into_inner();
        let mut draws = self.lock();
        let forced = draws.script.pop_front().or(draws.fixed);
        match forced {
            Some(draw) => draw.clamp(low, high.max(low)),
            None => draws.rng.gen_range(low..=high.max(low)),
        }
    }
}

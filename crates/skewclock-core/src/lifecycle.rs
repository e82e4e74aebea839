//! Per-machine running flag.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Shared running flag for one machine.
///
/// Starts running. [`Lifecycle::stop`] clears it exactly once; the scheduler
/// and the listener poll it to know when to exit.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    running: Arc<AtomicBool>,
}

impl Lifecycle {
    /// New flag in the running state.
    pub fn new() -> Self {
        Self { running: Arc::new(AtomicBool::new(true)) }
    }

    /// True until `stop` is called.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Clear the flag.
    ///
    /// Returns `true` only for the call that actually stopped the machine;
    /// later calls are no-ops returning `false`.
    pub fn stop(&self) -> bool {
        self.running.swap(false, Ordering::AcqRel)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

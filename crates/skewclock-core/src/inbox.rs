//! Inbound message buffer.
//!
//! Decouples network arrival from event-loop consumption. Listener connection
//! handlers push concurrently; the scheduler is the single consumer.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Unbounded, thread-safe FIFO of received logical-clock values.
///
/// Cloning yields another handle to the same queue.
///
/// # Invariants
///
/// - FIFO: values pop in the order their pushes completed
/// - Non-blocking: neither `push` nor `try_pop` waits on anything but the
///   internal lock, which is never held across I/O
#[derive(Debug, Clone, Default)]
pub struct Inbox {
    queue: Arc<Mutex<VecDeque<u64>>>,
}

impl Inbox {
    /// Create an empty inbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to the tail.
    pub fn push(&self, value: u64) {
        self.lock().push_back(value);
    }

    /// Remove and return the head, or `None` if empty.
    pub fn try_pop(&self) -> Option<u64> {
        self.lock().pop_front()
    }

    /// Current length.
    ///
    /// Diagnostic only: may be stale by the time the caller reads it.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<u64>> {
        // a panicking producer cannot leave the deque half-updated
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn fifo_order() {
        let inbox = Inbox::new();
        inbox.push(5);
        inbox.push(10);

        assert_eq!(inbox.try_pop(), Some(5));
        assert_eq!(inbox.try_pop(), Some(10));
        assert_eq!(inbox.try_pop(), None);
    }

    #[test]
    fn empty_inbox() {
        let inbox = Inbox::new();
        assert!(inbox.is_empty());
        assert_eq!(inbox.len(), 0);
        assert_eq!(inbox.try_pop(), None);
    }

    #[test]
    fn len_tracks_pushes_and_pops() {
        let inbox = Inbox::new();
        inbox.push(1);
        inbox.push(2);
        inbox.push(3);
        assert_eq!(inbox.len(), 3);
        inbox.try_pop();
        assert_eq!(inbox.len(), 2);
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let inbox = Inbox::new();
        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let inbox = inbox.clone();
                thread::spawn(move || {
                    for i in 0..1_000 {
                        inbox.push(t * 1_000 + i);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(inbox.len(), 8_000);

        // per-producer order survives interleaving
        let mut last = [None::<u64>; 8];
        while let Some(v) = inbox.try_pop() {
            let producer = (v / 1_000) as usize;
            if let Some(prev) = last[producer] {
                assert!(v > prev, "producer {producer} reordered: {prev} then {v}");
            }
            last[producer] = Some(v);
        }
    }
}

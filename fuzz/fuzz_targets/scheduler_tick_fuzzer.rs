//! Fuzz target for the tick scheduler
//!
//! # Strategy
//!
//! - Arrivals: arbitrary clock values (including near `u64::MAX`) pushed
//!   between ticks
//! - Draws: arbitrary draw values, in and out of `1..=10`
//! - Peer lists: zero to three peers, so positional sends can miss
//! - Stop: the scheduler may be stopped at any point
//!
//! # Invariants
//!
//! - Clock follows the Lamport rules and never wraps
//! - A pending message ALWAYS wins the tick over a local event
//! - Deliveries carry the post-increment clock, one per recipient
//! - No tick is planned after `stop`
//! - NEVER panic

#![no_main]

use std::time::SystemTime;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use skewclock_core::{
    EventKind, EventOutcome, Inbox, LamportClock, PeerAddr, PeerList, Scheduler,
};

#[derive(Debug, Clone, Arbitrary)]
enum Step {
    Arrive(u64),
    Tick(u32),
    Stop,
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzInput {
    peers: u8,
    start_clock: u64,
    steps: Vec<Step>,
}

fuzz_target!(|input: FuzzInput| {
    let peers: PeerList = (1..=u16::from(input.peers % 4))
        .filter_map(|id| PeerAddr::for_machine(id, "127.0.0.1", 5000))
        .collect();
    let inbox = Inbox::new();
    let clock = LamportClock::starting_at(input.start_clock);
    let mut scheduler = Scheduler::new(0, clock, inbox.clone(), peers.clone());
    let mut stopped = false;

    for step in input.steps {
        match step {
            Step::Arrive(value) => inbox.push(value),
            Step::Stop => {
                scheduler.stop();
                stopped = true;
            },
            Step::Tick(draw) => {
                let before = scheduler.clock();
                let pending = inbox.len();

                let Some(plan) = scheduler.plan_tick(|| EventOutcome::from_draw(draw)) else {
                    assert!(stopped, "running scheduler refused to tick");
                    continue;
                };
                assert!(!stopped, "stopped scheduler planned a tick");

                let after = plan.clock();
                assert!(plan.deliveries().iter().all(|d| d.value == after));

                let record = plan.into_record(SystemTime::UNIX_EPOCH);
                match record.kind {
                    EventKind::Receive { value } => {
                        assert!(pending > 0);
                        assert_eq!(after, before.max(value).saturating_add(1));
                        assert_eq!(record.queue_len, pending - 1);
                    },
                    EventKind::Send { ref recipients } => {
                        assert_eq!(pending, 0, "send with messages pending");
                        assert_eq!(after, before.saturating_add(1));
                        assert!(recipients.len() <= peers.len());
                    },
                    EventKind::Internal => {
                        assert_eq!(pending, 0, "internal event with messages pending");
                        assert_eq!(after, before.saturating_add(1));
                    },
                }
            },
        }
    }
});

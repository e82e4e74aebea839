//! Oracles over scenario records.
//!
//! Each oracle returns `Err` with a description of the first violation, so
//! tests can `?` them inside scenario closures or proptest bodies alike.

use std::collections::HashMap;

use skewclock_core::{EventKind, EventRecord};

use crate::scenario::ScenarioOutcome;

/// Ticks are numbered `1, 2, ..` and each clock follows from its predecessor
/// by the Lamport rules.
pub fn check_clock_rules(records: &[EventRecord]) -> Result<(), String> {
    let mut previous = 0u64;
    for (i, r) in records.iter().enumerate() {
        let expected_tick = i as u64 + 1;
        if r.tick != expected_tick {
            return Err(format!("record {i} has tick {}, expected {expected_tick}", r.tick));
        }

        let expected = match r.kind {
            EventKind::Receive { value } => previous.max(value).saturating_add(1),
            EventKind::Send { .. } | EventKind::Internal => previous.saturating_add(1),
        };
        if r.clock != expected {
            return Err(format!(
                "tick {} ({}) moved clock {previous} -> {}, expected {expected}",
                r.tick,
                r.kind.label(),
                r.clock
            ));
        }
        previous = r.clock;
    }
    Ok(())
}

/// Every received value was sent to that machine by some peer, and no value
/// was received more often than it was sent.
pub fn check_receives_were_sent(outcome: &ScenarioOutcome) -> Result<(), String> {
    let ids = outcome.ids();
    for &to in &ids {
        let mut available: HashMap<u64, usize> = HashMap::new();
        for &from in ids.iter().filter(|&&from| from != to) {
            for value in outcome.sent_to(from, to) {
                *available.entry(value).or_default() += 1;
            }
        }

        for r in outcome.records(to) {
            let Some(value) = r.received_value() else { continue };
            match available.get_mut(&value) {
                Some(n) if *n > 0 => *n -= 1,
                _ => {
                    return Err(format!(
                        "vm{to} tick {} received {value}, which no peer sent to it",
                        r.tick
                    ));
                },
            }
        }
    }
    Ok(())
}

/// Number of receive events across all machines.
pub fn total_receives(outcome: &ScenarioOutcome) -> usize {
    outcome
        .machines()
        .iter()
        .flat_map(|m| &m.records)
        .filter(|r| r.received_value().is_some())
        .count()
}

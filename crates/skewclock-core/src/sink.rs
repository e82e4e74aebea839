//! Event sink abstraction.
//!
//! The scheduler hands every [`EventRecord`] to an [`EventSink`] and never
//! looks at it again. Formatting and persistence belong to the sink.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::event::{EventRecord, MachineInfo};

/// Consumer of a machine's event stream.
///
/// Calls arrive in order: `started` once, `record` once per tick, then
/// `finished` once after the scheduler stops. Implementations must not fail
/// the caller; I/O errors are theirs to report.
pub trait EventSink: Send + 'static {
    /// Machine metadata, before the first tick.
    fn started(&mut self, info: &MachineInfo);

    /// One tick's record.
    fn record(&mut self, record: &EventRecord);

    /// Scheduler reached its terminal state.
    fn finished(&mut self) {}
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn started(&mut self, info: &MachineInfo) {
        (**self).started(info);
    }

    fn record(&mut self, record: &EventRecord) {
        (**self).record(record);
    }

    fn finished(&mut self) {
        (**self).finished();
    }
}

#[derive(Debug, Default)]
struct MemorySinkState {
    info: Option<MachineInfo>,
    records: Vec<EventRecord>,
    finished: bool,
}

/// In-memory sink, mostly for tests.
///
/// Clones share the same storage, so a test can keep one handle and give the
/// other to the machine.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemorySinkState>>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata received at startup.
    pub fn info(&self) -> Option<MachineInfo> {
        self.lock().info.clone()
    }

    /// Snapshot of every record so far.
    pub fn records(&self) -> Vec<EventRecord> {
        self.lock().records.clone()
    }

    /// Number of records so far.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// True if no tick has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// True once the scheduler has stopped.
    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    fn lock(&self) -> MutexGuard<'_, MemorySinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for MemorySink {
    fn started(&mut self, info: &MachineInfo) {
        self.lock().info = Some(info.clone());
    }

    fn record(&mut self, record: &EventRecord) {
        self.lock().records.push(record.clone());
    }

    fn finished(&mut self) {
        self.lock().finished = true;
    }
}

//! Tick scheduler.
//!
//! Split in two halves, like the rest of the core:
//!
//! - [`Scheduler`] is synchronous. Each call to [`Scheduler::plan_tick`]
//!   performs exactly one clock mutation and returns a [`TickPlan`] holding
//!   the sends to perform and the record to emit.
//! - [`TickDriver`] owns the I/O: it executes the plan's deliveries
//!   concurrently through a [`PeerLink`], stamps and emits the record, and sleeps out the rest of the
//!   tick budget.
//!
//! # State machine
//!
//! ```text
//! Running --(running flag observed false at top of tick)--> Stopped
//! ```
//!
//! `Stopped` is terminal: `plan_tick` returns `None` from then on.

use std::time::{Duration, SystemTime};

use futures::future::join_all;

use crate::{
    clock::LamportClock,
    env::Environment,
    event::{EventKind, EventRecord},
    inbox::Inbox,
    lifecycle::Lifecycle,
    link::{PeerLink, SendOutcome},
    outcome::EventOutcome,
    peer::{MachineId, PeerAddr, PeerList},
    sink::EventSink,
};

/// Scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Ticking.
    Running,
    /// Terminal.
    Stopped,
}

/// One value to hand to one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Recipient.
    pub peer: PeerAddr,
    /// Clock value to send.
    pub value: u64,
}

/// Everything one tick decided, before any I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickPlan {
    tick: u64,
    kind: EventKind,
    clock: u64,
    queue_len: usize,
    deliveries: Vec<Delivery>,
}

impl TickPlan {
    /// Sends to perform before the record is emitted.
    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    /// Event kind this tick will record.
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Clock value after this tick's mutation.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Finalize into the immutable record.
    pub fn into_record(self, timestamp: SystemTime) -> EventRecord {
        EventRecord {
            tick: self.tick,
            kind: self.kind,
            timestamp,
            clock: self.clock,
            queue_len: self.queue_len,
        }
    }
}

/// Per-machine decision logic.
#[derive(Debug)]
pub struct Scheduler {
    id: MachineId,
    clock: LamportClock,
    inbox: Inbox,
    peers: PeerList,
    state: SchedulerState,
    ticks: u64,
}

impl Scheduler {
    /// Scheduler over the given clock, inbox and peers.
    pub fn new(id: MachineId, clock: LamportClock, inbox: Inbox, peers: PeerList) -> Self {
        Self { id, clock, inbox, peers, state: SchedulerState::Running, ticks: 0 }
    }

    /// Machine id.
    pub fn id(&self) -> MachineId {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Ticks executed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Current logical clock.
    pub fn clock(&self) -> u64 {
        self.clock.current()
    }

    /// Enter the terminal state.
    ///
    /// Returns `true` only on the transition.
    pub fn stop(&mut self) -> bool {
        let was_running = self.state == SchedulerState::Running;
        self.state = SchedulerState::Stopped;
        was_running
    }

    /// Decide one tick.
    ///
    /// A non-empty inbox always wins: one value is popped and the receive
    /// rule applied. Otherwise `draw` picks a local event. `draw` is only
    /// invoked when the inbox is empty.
    pub fn plan_tick(&mut self, draw: impl FnOnce() -> EventOutcome) -> Option<TickPlan> {
        if self.state == SchedulerState::Stopped {
            return None;
        }

        self.ticks += 1;
        let plan = match self.inbox.try_pop() {
            Some(value) => self.plan_receive(value),
            None => self.plan_local(draw()),
        };
        Some(plan)
    }

    fn plan_receive(&self, value: u64) -> TickPlan {
        let clock = self.clock.on_receive(value);
        TickPlan {
            tick: self.ticks,
            kind: EventKind::Receive { value },
            clock,
            queue_len: self.inbox.len(),
            deliveries: Vec::new(),
        }
    }

    fn plan_local(&self, outcome: EventOutcome) -> TickPlan {
        if !outcome.is_send() {
            let clock = self.clock.on_internal();
            return TickPlan {
                tick: self.ticks,
                kind: EventKind::Internal,
                clock,
                queue_len: self.inbox.len(),
                deliveries: Vec::new(),
            };
        }

        // a missing positional peer still advances the clock as a send
        let clock = self.clock.on_send();
        let targets: Vec<&PeerAddr> =
            outcome.targets(&self.peers).into_iter().filter_map(|i| self.peers.get(i)).collect();

        if targets.is_empty() {
            tracing::trace!(machine = self.id, ?outcome, "send has no addressable peer");
        }

        TickPlan {
            tick: self.ticks,
            kind: EventKind::Send { recipients: targets.iter().map(|p| p.id).collect() },
            clock,
            queue_len: self.inbox.len(),
            deliveries: targets
                .into_iter()
                .map(|peer| Delivery { peer: peer.clone(), value: clock })
                .collect(),
        }
    }
}

/// Runs a [`Scheduler`] against real (or simulated) time and I/O.
pub struct TickDriver<E, L, S> {
    scheduler: Scheduler,
    env: E,
    link: L,
    sink: S,
    lifecycle: Lifecycle,
    tick_budget: Duration,
}

impl<E, L, S> TickDriver<E, L, S>
where
    E: Environment,
    L: PeerLink,
    S: EventSink,
{
    /// Driver ticking once per `tick_budget`.
    pub fn new(
        scheduler: Scheduler,
        env: E,
        link: L,
        sink: S,
        lifecycle: Lifecycle,
        tick_budget: Duration,
    ) -> Self {
        Self { scheduler, env, link, sink, lifecycle, tick_budget }
    }

    /// The driven scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Tick until the running flag clears, then notify the sink.
    ///
    /// The flag is checked at the top of every tick, so at most the tick in
    /// progress (and its sleep) completes after a stop.
    pub async fn run(mut self) -> Scheduler {
        let id = self.scheduler.id();
        tracing::info!(machine = id, budget = ?self.tick_budget, "scheduler running");

        loop {
            if !self.lifecycle.is_running() {
                self.scheduler.stop();
                break;
            }

            let started = self.env.now();
            self.tick().await;
            let elapsed = self.env.now() - started;

            // overruns start the next tick immediately, no catch-up
            if let Some(remaining) = self.tick_budget.checked_sub(elapsed)
                && !remaining.is_zero()
            {
                self.env.sleep(remaining).await;
            }
        }

        self.sink.finished();
        tracing::info!(
            machine = id,
            ticks = self.scheduler.ticks(),
            clock = self.scheduler.clock(),
            "scheduler stopped"
        );
        self.scheduler
    }

    /// Execute one tick without sleeping.
    ///
    /// Returns the emitted record, or `None` once the scheduler is stopped.
    pub async fn tick(&mut self) -> Option<EventRecord> {
        let env = &self.env;
        let plan = self.scheduler.plan_tick(|| EventOutcome::draw(env))?;

        // all sends run together, so a broadcast is bounded by one timeout
        let outcomes = join_all(
            plan.deliveries().iter().map(|delivery| self.link.send(&delivery.peer, delivery.value)),
        )
        .await;

        for (delivery, outcome) in plan.deliveries().iter().zip(outcomes) {
            // best effort: the outcome never changes what the tick does
            match outcome {
                SendOutcome::Delivered => {
                    tracing::trace!(
                        machine = self.scheduler.id(),
                        peer = %delivery.peer,
                        value = delivery.value,
                        "sent"
                    );
                },
                SendOutcome::Failed(reason) => {
                    tracing::debug!(
                        machine = self.scheduler.id(),
                        peer = %delivery.peer,
                        %reason,
                        "send lost"
                    );
                },
            }
        }

        let record = plan.into_record(self.env.wall_clock());
        self.sink.record(&record);
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        future::Future,
        sync::{Arc, Mutex},
    };

    use super::*;
    use crate::{
        link::{SendFailure, TransportLink},
        sink::MemorySink,
        transport::Transport,
    };

    fn peers(ids: &[MachineId]) -> PeerList {
        ids.iter().filter_map(|id| PeerAddr::for_machine(*id, "127.0.0.1", 5000)).collect()
    }

    fn scheduler(peer_ids: &[MachineId]) -> Scheduler {
        Scheduler::new(0, LamportClock::new(), Inbox::new(), peers(peer_ids))
    }

    #[test]
    fn receive_wins_over_draw() {
        let inbox = Inbox::new();
        let clock = LamportClock::starting_at(5);
        let mut s = Scheduler::new(0, clock, inbox.clone(), peers(&[1]));
        inbox.push(7);
        inbox.push(2);

        let plan = s.plan_tick(|| unreachable!("draw must not happen with a pending message"));
        let plan = plan.unwrap();
        assert_eq!(plan.kind(), &EventKind::Receive { value: 7 });
        assert_eq!(plan.clock(), 8);
        assert!(plan.deliveries().is_empty());

        let record = plan.into_record(SystemTime::UNIX_EPOCH);
        assert_eq!(record.queue_len, 1, "queue length is taken after the pop");
    }

    #[test]
    fn send_one_targets_positional_peer() {
        let mut s = scheduler(&[1, 2]);
        let plan = s.plan_tick(|| EventOutcome::SendOne(1)).unwrap();

        assert_eq!(plan.clock(), 1);
        assert_eq!(plan.kind(), &EventKind::Send { recipients: vec![2] });
        assert_eq!(plan.deliveries().len(), 1);
        assert_eq!(plan.deliveries()[0].peer.id, 2);
        assert_eq!(plan.deliveries()[0].value, 1, "payload is the post-increment clock");
    }

    #[test]
    fn send_all_targets_every_peer_in_order() {
        let mut s = scheduler(&[2, 1]);
        let plan = s.plan_tick(|| EventOutcome::SendAll).unwrap();

        assert_eq!(plan.kind(), &EventKind::Send { recipients: vec![2, 1] });
        assert!(plan.deliveries().iter().all(|d| d.value == 1));
    }

    #[test]
    fn missing_second_peer_degrades_to_empty_send() {
        let mut s = scheduler(&[1]);
        let plan = s.plan_tick(|| EventOutcome::from_draw(2)).unwrap();

        assert_eq!(plan.clock(), 1, "clock still advances by exactly one");
        assert_eq!(plan.kind(), &EventKind::Send { recipients: vec![] });
        assert!(plan.deliveries().is_empty());
    }

    #[test]
    fn no_peers_send_all_degrades() {
        let mut s = scheduler(&[]);
        let plan = s.plan_tick(|| EventOutcome::SendAll).unwrap();
        assert_eq!(plan.kind(), &EventKind::Send { recipients: vec![] });
        assert_eq!(plan.clock(), 1);
    }

    #[test]
    fn internal_advances_without_deliveries() {
        let mut s = scheduler(&[1, 2]);
        let plan = s.plan_tick(|| EventOutcome::Internal).unwrap();
        assert_eq!(plan.kind(), &EventKind::Internal);
        assert_eq!(plan.clock(), 1);
        assert!(plan.deliveries().is_empty());
    }

    #[test]
    fn stopped_is_terminal() {
        let mut s = scheduler(&[1]);
        assert!(s.stop());
        assert!(!s.stop());
        assert_eq!(s.state(), SchedulerState::Stopped);
        assert!(s.plan_tick(|| EventOutcome::Internal).is_none());
        assert_eq!(s.clock(), 0);
        assert_eq!(s.ticks(), 0);
    }

    #[test]
    fn tick_numbers_are_sequential() {
        let mut s = scheduler(&[1]);
        let ticks: Vec<u64> = (0..5)
            .filter_map(|_| s.plan_tick(|| EventOutcome::Internal))
            .map(|p| p.into_record(SystemTime::UNIX_EPOCH).tick)
            .collect();
        assert_eq!(ticks, vec![1, 2, 3, 4, 5]);
    }

    /// Environment on tokio's clock with scripted draws.
    #[derive(Clone)]
    struct ScriptedEnv {
        draws: Arc<Mutex<VecDeque<u32>>>,
    }

    impl ScriptedEnv {
        fn new(draws: &[u32]) -> Self {
            Self { draws: Arc::new(Mutex::new(draws.iter().copied().collect())) }
        }
    }

    impl Environment for ScriptedEnv {
        type Instant = tokio::time::Instant;

        fn now(&self) -> tokio::time::Instant {
            tokio::time::Instant::now()
        }

        fn wall_clock(&self) -> SystemTime {
            SystemTime::UNIX_EPOCH
        }

        fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
            tokio::time::sleep(duration)
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            buffer.fill(0);
        }

        fn random_in(&self, range: std::ops::RangeInclusive<u32>) -> u32 {
            self.draws.lock().unwrap().pop_front().unwrap_or(*range.end())
        }
    }

    /// Link that records attempts and fails or stalls on demand.
    #[derive(Clone, Default)]
    struct RecordingLink {
        sent: Arc<Mutex<Vec<(MachineId, u64)>>>,
        stall: Option<Duration>,
    }

    impl PeerLink for RecordingLink {
        fn send(&self, peer: &PeerAddr, value: u64) -> impl Future<Output = SendOutcome> + Send {
            let sent = Arc::clone(&self.sent);
            let stall = self.stall;
            let id = peer.id;
            async move {
                sent.lock().unwrap().push((id, value));
                match stall {
                    Some(d) => {
                        tokio::time::sleep(d).await;
                        SendOutcome::Failed(SendFailure::TimedOut(d))
                    },
                    None => SendOutcome::Delivered,
                }
            }
        }
    }

    fn driver(
        draws: &[u32],
        peer_ids: &[MachineId],
        link: RecordingLink,
        rate: u32,
    ) -> (TickDriver<ScriptedEnv, RecordingLink, MemorySink>, MemorySink, Lifecycle) {
        let sink = MemorySink::new();
        let lifecycle = Lifecycle::new();
        let d = TickDriver::new(
            scheduler(peer_ids),
            ScriptedEnv::new(draws),
            link,
            sink.clone(),
            lifecycle.clone(),
            Duration::from_secs(1) / rate,
        );
        (d, sink, lifecycle)
    }

    #[tokio::test(start_paused = true)]
    async fn tick_sends_then_emits() {
        let link = RecordingLink::default();
        let (mut d, sink, _) = driver(&[3], &[1, 2], link.clone(), 1);

        let record = d.tick().await.unwrap();
        assert_eq!(record.kind, EventKind::Send { recipients: vec![1, 2] });
        assert_eq!(record.clock, 1);
        assert_eq!(*link.sent.lock().unwrap(), vec![(1, 1), (2, 1)]);
        assert_eq!(sink.records(), vec![record]);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_peers_do_not_block_tick() {
        let stall = Duration::from_millis(300);
        let link = RecordingLink { stall: Some(stall), ..RecordingLink::default() };
        let (mut d, sink, _) = driver(&[1], &[1], link, 1);

        let started = tokio::time::Instant::now();
        let record = d.tick().await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= stall, "tick waited for the send: {elapsed:?}");
        assert!(elapsed < stall * 2, "tick is bounded by the send timeout: {elapsed:?}");
        assert_eq!(record.kind, EventKind::Send { recipients: vec![1] });
        assert_eq!(sink.len(), 1);
    }

    /// Transport whose connects never complete.
    #[derive(Clone)]
    struct BlackholeTransport;

    impl Transport for BlackholeTransport {
        type Stream = tokio::io::DuplexStream;
        type Listener = ();

        fn bind(&self, _host: &str, _port: u16) -> impl Future<Output = std::io::Result<()>> + Send {
            std::future::ready(Ok(()))
        }

        fn local_port(&self, _listener: &()) -> std::io::Result<u16> {
            Ok(0)
        }

        fn accept(
            &self,
            _listener: &(),
        ) -> impl Future<Output = std::io::Result<Self::Stream>> + Send {
            std::future::pending()
        }

        fn connect(&self, _peer: &PeerAddr) -> impl Future<Output = std::io::Result<Self::Stream>> + Send {
            std::future::pending()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn broadcast_to_unreachable_peers_is_bounded_by_one_timeout() {
        let send_timeout = Duration::from_secs(1);
        let sink = MemorySink::new();
        let mut d = TickDriver::new(
            scheduler(&[1, 2]),
            ScriptedEnv::new(&[3]),
            TransportLink::new(BlackholeTransport, send_timeout),
            sink.clone(),
            Lifecycle::new(),
            Duration::from_secs(1),
        );

        let started = tokio::time::Instant::now();
        let record = d.tick().await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(record.kind, EventKind::Send { recipients: vec![1, 2] });
        assert_eq!(record.clock, 1);
        assert!(elapsed >= send_timeout, "sends were not attempted: {elapsed:?}");
        assert!(elapsed < send_timeout * 2, "broadcast waited per peer: {elapsed:?}");
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_ticks_at_clock_rate_until_stopped() {
        let (d, sink, lifecycle) = driver(&[], &[1], RecordingLink::default(), 4);
        let handle = tokio::spawn(d.run());

        // ticks at t=0, 250, 500, 750ms; stop lands mid-sleep of the last one
        tokio::time::sleep(Duration::from_millis(900)).await;
        lifecycle.stop();
        let scheduler = handle.await.unwrap();

        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(sink.len(), 4);
        assert!(sink.is_finished());

        let clocks: Vec<u64> = sink.records().iter().map(|r| r.clock).collect();
        assert_eq!(clocks, vec![1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn overrun_tick_is_not_compensated() {
        // 2 ticks/s budget, every send stalls 700ms
        let link = RecordingLink { stall: Some(Duration::from_millis(700)), ..Default::default() };
        let (d, sink, lifecycle) = driver(&[1, 1, 1, 1], &[1], link, 2);
        let handle = tokio::spawn(d.run());

        tokio::time::sleep(Duration::from_millis(2_000)).await;
        lifecycle.stop();
        handle.await.unwrap();

        // ticks start at 0, 700, 1400, 2100 (stop seen at 2100)
        assert_eq!(sink.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_first_tick_emits_nothing() {
        let (d, sink, lifecycle) = driver(&[], &[1], RecordingLink::default(), 6);
        lifecycle.stop();
        let scheduler = d.run().await;

        assert_eq!(scheduler.ticks(), 0);
        assert!(sink.is_empty());
        assert!(sink.is_finished());
    }
}

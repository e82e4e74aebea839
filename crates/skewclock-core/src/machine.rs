//! Machine composition and lifecycle.
//!
//! A [`Machine`] wires one inbox, listener, clock, scheduler and peer list
//! together and runs the listener and the tick driver as two tasks. The
//! caller owns the returned handle: `stop` clears the running flag, `join`
//! waits for both loops to wind down.

use tokio::task::JoinHandle;

use crate::{
    clock::LamportClock,
    config::{ClockRate, MachineConfig},
    env::Environment,
    error::MachineError,
    event::MachineInfo,
    inbox::Inbox,
    lifecycle::Lifecycle,
    link::TransportLink,
    listener::Listener,
    peer::MachineId,
    scheduler::{Scheduler, TickDriver},
    sink::EventSink,
    transport::Transport,
};

/// Handle to one running machine.
#[derive(Debug)]
pub struct Machine {
    info: MachineInfo,
    clock: LamportClock,
    inbox: Inbox,
    lifecycle: Lifecycle,
    scheduler_task: JoinHandle<Scheduler>,
    listener_task: JoinHandle<()>,
}

impl Machine {
    /// Validate `config`, bind the listener and start both loops.
    ///
    /// Binding is the only network step that can fail; it fails here, not
    /// later. The clock rate is drawn from `env` unless the config fixes it.
    pub async fn start<E, T, S>(
        config: MachineConfig,
        env: E,
        transport: T,
        mut sink: S,
    ) -> Result<Self, MachineError>
    where
        E: Environment,
        T: Transport,
        S: EventSink,
    {
        config.validate()?;

        let clock_rate = config.clock_rate.unwrap_or_else(|| ClockRate::draw(&env));
        let clock = LamportClock::new();
        let inbox = Inbox::new();
        let lifecycle = Lifecycle::new();

        let listener =
            Listener::bind(transport.clone(), &config, inbox.clone(), lifecycle.clone()).await?;

        let info = MachineInfo {
            id: config.id,
            clock_rate,
            peers: config.peers.ids(),
            listen_port: listener.local_port(),
        };
        tracing::info!(
            machine = info.id,
            clock_rate = clock_rate.get(),
            port = info.listen_port,
            peers = ?info.peers,
            "machine started"
        );
        sink.started(&info);

        let scheduler = Scheduler::new(config.id, clock.clone(), inbox.clone(), config.peers);
        let link = TransportLink::new(transport, config.send_timeout);
        let driver = TickDriver::new(
            scheduler,
            env.clone(),
            link,
            sink,
            lifecycle.clone(),
            clock_rate.tick_budget(),
        );

        let startup_delay = config.startup_delay;
        let scheduler_task = tokio::spawn(async move {
            if !startup_delay.is_zero() {
                env.sleep(startup_delay).await;
            }
            driver.run().await
        });
        let listener_task = tokio::spawn(listener.run());

        Ok(Self { info, clock, inbox, lifecycle, scheduler_task, listener_task })
    }

    /// Machine id.
    pub fn id(&self) -> MachineId {
        self.info.id
    }

    /// Ticks per second.
    pub fn clock_rate(&self) -> ClockRate {
        self.info.clock_rate
    }

    /// Startup metadata.
    pub fn info(&self) -> &MachineInfo {
        &self.info
    }

    /// Current logical clock.
    pub fn clock(&self) -> u64 {
        self.clock.current()
    }

    /// Messages waiting in the inbox.
    pub fn inbox_len(&self) -> usize {
        self.inbox.len()
    }

    /// True until `stop` is called.
    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    /// Another handle to the running flag.
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.clone()
    }

    /// Clear the running flag.
    ///
    /// Returns `true` for the call that stopped the machine; repeated calls
    /// are harmless no-ops.
    pub fn stop(&self) -> bool {
        let stopped = self.lifecycle.stop();
        if stopped {
            tracing::info!(machine = self.info.id, clock = self.clock(), "stop requested");
        }
        stopped
    }

    /// Wait for the scheduler and listener to exit.
    ///
    /// Only returns once `stop` has been called (from here or through a
    /// [`Lifecycle`] handle). Yields the scheduler in its terminal state.
    pub async fn join(self) -> Result<Scheduler, MachineError> {
        let scheduler = self.scheduler_task.await;
        let listener = self.listener_task.await;

        let scheduler = scheduler.map_err(|e| MachineError::Task(e.to_string()))?;
        listener.map_err(|e| MachineError::Task(e.to_string()))?;
        Ok(scheduler)
    }
}

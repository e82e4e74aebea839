//! Cluster orchestration.
//!
//! Starts `N` fully meshed machines on one host, each listening on
//! `base_port + id` and writing its own log file.

use std::{path::PathBuf, time::Duration};

use skewclock_core::{ClockRate, EventSink, Machine, MachineConfig, MachineId, Scheduler};

use crate::{
    error::NodeError,
    log_sink::{TextLogSink, log_path},
    system_env::SystemEnv,
    transport::TokioTransport,
};

/// Configuration for one simulation run.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Number of machines.
    pub machines: u16,
    /// Host every machine binds and dials.
    pub host: String,
    /// Machine `id` listens on `base_port + id`.
    pub base_port: u16,
    /// Directory for per-machine log files.
    pub log_dir: PathBuf,
    /// Run number, used in log file names.
    pub run_id: u32,
    /// Fixed clock rate for every machine, or `None` to draw per machine.
    pub clock_rate: Option<ClockRate>,
    /// Upper bound on one peer send.
    pub send_timeout: Duration,
    /// Accept loop shutdown check interval.
    pub accept_poll_interval: Duration,
    /// Upper bound on reading one inbound payload.
    pub read_timeout: Duration,
    /// Pause before each machine's first tick.
    pub startup_delay: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        let machine = MachineConfig::default();
        Self {
            machines: 3,
            host: machine.listen_host,
            base_port: machine.listen_port,
            log_dir: PathBuf::from("logs"),
            run_id: 1,
            clock_rate: None,
            send_timeout: machine.send_timeout,
            accept_poll_interval: machine.accept_poll_interval,
            read_timeout: machine.read_timeout,
            startup_delay: machine.startup_delay,
        }
    }
}

impl ClusterConfig {
    /// Reject empty clusters and port ranges that overflow.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.machines == 0 {
            return Err(NodeError::Config("cluster needs at least one machine".to_string()));
        }
        if self.base_port.checked_add(self.machines - 1).is_none() {
            return Err(NodeError::Config(format!(
                "{} machines starting at port {} exceed the port range",
                self.machines, self.base_port
            )));
        }
        Ok(())
    }

    /// Config for machine `id`.
    pub fn machine(&self, id: MachineId) -> MachineConfig {
        MachineConfig {
            clock_rate: self.clock_rate,
            send_timeout: self.send_timeout,
            accept_poll_interval: self.accept_poll_interval,
            read_timeout: self.read_timeout,
            startup_delay: self.startup_delay,
            ..MachineConfig::cluster_member(id, self.machines, &self.host, self.base_port)
        }
    }

    /// Log file for machine `id` in this run.
    pub fn log_path(&self, id: MachineId) -> PathBuf {
        log_path(&self.log_dir, self.run_id, id)
    }
}

/// Final state of one machine after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineSummary {
    /// Machine id.
    pub id: MachineId,
    /// Ticks per second the machine ran at.
    pub clock_rate: ClockRate,
    /// Ticks executed.
    pub ticks: u64,
    /// Logical clock at shutdown.
    pub final_clock: u64,
}

/// Running set of machines.
#[derive(Debug)]
pub struct Cluster {
    machines: Vec<Machine>,
}

impl Cluster {
    /// Start every machine with a [`TextLogSink`] under `config.log_dir`.
    pub async fn start(config: &ClusterConfig) -> Result<Self, NodeError> {
        Self::start_with_sinks(config, |id| {
            let path = config.log_path(id);
            TextLogSink::create(&path).map_err(|source| NodeError::LogFile { path, source })
        })
        .await
    }

    /// Start every machine with the sink built by `make_sink`.
    ///
    /// If any machine fails to start, the ones already running are stopped
    /// and joined before the error is returned.
    pub async fn start_with_sinks<S, F>(
        config: &ClusterConfig,
        mut make_sink: F,
    ) -> Result<Self, NodeError>
    where
        S: EventSink,
        F: FnMut(MachineId) -> Result<S, NodeError>,
    {
        config.validate()?;

        let mut cluster = Self { machines: Vec::with_capacity(usize::from(config.machines)) };
        for id in 0..config.machines {
            let started = match make_sink(id) {
                Ok(sink) => {
                    Machine::start(config.machine(id), SystemEnv::new(), TokioTransport::new(), sink)
                        .await
                        .map_err(NodeError::from)
                },
                Err(e) => Err(e),
            };

            match started {
                Ok(machine) => cluster.machines.push(machine),
                Err(e) => {
                    tracing::error!(machine = id, error = %e, "machine failed to start");
                    cluster.stop();
                    // the start error is what the caller needs to see
                    let _ = cluster.join().await;
                    return Err(e);
                },
            }
        }

        tracing::info!(run = config.run_id, machines = config.machines, "cluster started");
        Ok(cluster)
    }

    /// Running machines, in id order.
    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    /// Stop every machine.
    pub fn stop(&self) {
        for machine in &self.machines {
            machine.stop();
        }
    }

    /// Wait for every machine to exit.
    ///
    /// All machines are joined even if one fails; the first failure is
    /// returned.
    pub async fn join(self) -> Result<Vec<MachineSummary>, NodeError> {
        let mut summaries = Vec::with_capacity(self.machines.len());
        let mut first_error = None;

        for machine in self.machines {
            let clock_rate = machine.clock_rate();
            match machine.join().await {
                Ok(scheduler) => summaries.push(summarize(&scheduler, clock_rate)),
                Err(e) => {
                    tracing::error!(error = %e, "machine did not shut down cleanly");
                    first_error.get_or_insert(e);
                },
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(summaries),
        }
    }
}

fn summarize(scheduler: &Scheduler, clock_rate: ClockRate) -> MachineSummary {
    MachineSummary {
        id: scheduler.id(),
        clock_rate,
        ticks: scheduler.ticks(),
        final_clock: scheduler.clock(),
    }
}

/// Run one simulation: start the cluster, let it run for `duration`, then
/// stop and join it.
pub async fn run_simulation(
    config: &ClusterConfig,
    duration: Duration,
) -> Result<Vec<MachineSummary>, NodeError> {
    let cluster = Cluster::start(config).await?;
    tokio::time::sleep(duration).await;
    cluster.stop();
    let summaries = cluster.join().await?;

    for s in &summaries {
        tracing::info!(
            run = config.run_id,
            machine = s.id,
            clock_rate = s.clock_rate.get(),
            ticks = s.ticks,
            final_clock = s.final_clock,
            "machine finished"
        );
    }
    Ok(summaries)
}

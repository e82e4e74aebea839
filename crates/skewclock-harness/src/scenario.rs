//! Scenario builder for cluster simulations.
//!
//! A scenario describes a fully meshed cluster, the network conditions it
//! runs under and how long it runs. [`Scenario::run`] executes it in a
//! turmoil simulation and returns every machine's records for oracles to
//! inspect.
//!
//! ```rust,ignore
//! let outcome = Scenario::new(7)
//!     .with_machines(3)
//!     .with_run_time(Duration::from_secs(20))
//!     .run()?;
//!
//! for id in outcome.ids() {
//!     oracle::check_clock_rules(outcome.records(id))?;
//! }
//! ```
//!
//! Each machine runs as a turmoil client named `vm<id>`, listening on
//! [`SIM_PORT`]. It starts, runs for the scenario's run time, stops and
//! joins; the simulation ends when every machine has joined.

use std::time::Duration;

use skewclock_core::{
    ClockRate, EventRecord, Machine, MachineConfig, MachineId, MachineInfo, MemorySink, PeerAddr,
    PeerList,
};

use crate::{sim_env::SimEnv, sim_transport::SimTransport};

/// Port every simulated machine listens on.
pub const SIM_PORT: u16 = 5000;

/// Turmoil host name of machine `id`.
pub fn host_name(id: MachineId) -> String {
    format!("vm{id}")
}

/// Config for machine `id` in a simulated mesh of `size` machines.
pub fn mesh_config(id: MachineId, size: u16) -> MachineConfig {
    let peers = (0..size)
        .filter(|&peer| peer != id)
        .map(|peer| PeerAddr { id: peer, host: host_name(peer), port: SIM_PORT })
        .collect::<PeerList>();
    MachineConfig {
        id,
        listen_host: host_name(id),
        listen_port: SIM_PORT,
        peers,
        ..MachineConfig::default()
    }
}

/// Per-machine settings.
#[derive(Debug, Clone)]
pub struct MachineSpec {
    /// Machine config; peers are filled in by [`mesh_config`].
    pub config: MachineConfig,
    /// Draws served before the seeded RNG.
    pub script: Vec<u32>,
    /// Draw used once the script is exhausted, instead of the RNG.
    pub fixed_draw: Option<u32>,
}

/// Cluster simulation description.
#[derive(Debug, Clone)]
pub struct Scenario {
    seed: u64,
    machines: Vec<MachineSpec>,
    run_time: Duration,
    fail_rate: f64,
    latency: Option<(Duration, Duration)>,
    partitions: Vec<(MachineId, MachineId)>,
}

impl Scenario {
    /// Three machines, random rates, ten virtual seconds, reliable network.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            machines: Vec::new(),
            run_time: Duration::from_secs(10),
            fail_rate: 0.0,
            latency: None,
            partitions: Vec::new(),
        }
        .with_machines(3)
    }

    /// Replace the cluster with `size` fully meshed machines.
    #[must_use]
    pub fn with_machines(mut self, size: u16) -> Self {
        self.machines = (0..size)
            .map(|id| MachineSpec { config: mesh_config(id, size), script: Vec::new(), fixed_draw: None })
            .collect();
        self
    }

    /// Fix the clock rate of machine `id`.
    #[must_use]
    pub fn with_clock_rate(mut self, id: MachineId, rate: ClockRate) -> Self {
        if let Some(spec) = self.spec_mut(id) {
            spec.config.clock_rate = Some(rate);
        }
        self
    }

    /// Set the pause before machine `id`'s first tick.
    #[must_use]
    pub fn with_startup_delay(mut self, id: MachineId, delay: Duration) -> Self {
        if let Some(spec) = self.spec_mut(id) {
            spec.config.startup_delay = delay;
        }
        self
    }

    /// Script machine `id`'s first draws.
    ///
    /// A machine without a fixed clock rate draws its rate first, from the
    /// same script.
    #[must_use]
    pub fn with_script(mut self, id: MachineId, draws: impl IntoIterator<Item = u32>) -> Self {
        if let Some(spec) = self.spec_mut(id) {
            spec.script.extend(draws);
        }
        self
    }

    /// Answer all of machine `id`'s unscripted draws with `draw`.
    #[must_use]
    pub fn with_fixed_draw(mut self, id: MachineId, draw: u32) -> Self {
        if let Some(spec) = self.spec_mut(id) {
            spec.fixed_draw = Some(draw);
        }
        self
    }

    /// Set the send timeout of every machine.
    #[must_use]
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        for spec in &mut self.machines {
            spec.config.send_timeout = timeout;
        }
        self
    }

    /// How long each machine runs before it is stopped.
    #[must_use]
    pub fn with_run_time(mut self, run_time: Duration) -> Self {
        self.run_time = run_time;
        self
    }

    /// Probability that turmoil drops a message.
    #[must_use]
    pub fn with_fail_rate(mut self, fail_rate: f64) -> Self {
        self.fail_rate = fail_rate;
        self
    }

    /// Fixed one-way network latency.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some((latency, latency));
        self
    }

    /// Cut the link between `a` and `b` for the whole run.
    #[must_use]
    pub fn with_partition(mut self, a: MachineId, b: MachineId) -> Self {
        self.partitions.push((a, b));
        self
    }

    fn spec_mut(&mut self, id: MachineId) -> Option<&mut MachineSpec> {
        self.machines.iter_mut().find(|s| s.config.id == id)
    }

    /// Run the simulation to completion.
    pub fn run(self) -> Result<ScenarioOutcome, Box<dyn std::error::Error>> {
        let mut builder = turmoil::Builder::new();
        builder
            .simulation_duration(self.run_time + Duration::from_secs(60))
            .rng_seed(self.seed)
            .fail_rate(self.fail_rate);
        if let Some((min, max)) = self.latency {
            builder.min_message_latency(min).max_message_latency(max);
        }
        let mut sim = builder.build();

        let mut sinks = Vec::with_capacity(self.machines.len());
        for spec in self.machines {
            let id = spec.config.id;
            let env = machine_env(self.seed, &spec);
            let sink = MemorySink::new();
            sinks.push((id, sink.clone()));

            let config = spec.config;
            let run_time = self.run_time;
            sim.client(host_name(id).as_str(), async move {
                let machine = Machine::start(config, env, SimTransport::new(), sink).await?;
                tokio::time::sleep(run_time).await;
                machine.stop();
                machine.join().await?;
                Ok(())
            });
        }

        for (a, b) in &self.partitions {
            sim.partition(host_name(*a).as_str(), host_name(*b).as_str());
        }

        sim.run()?;

        let machines = sinks
            .into_iter()
            .map(|(id, sink)| MachineRun { id, info: sink.info(), records: sink.records() })
            .collect();
        Ok(ScenarioOutcome { machines })
    }
}

fn machine_env(seed: u64, spec: &MachineSpec) -> SimEnv {
    // distinct stream per machine, same for every run of the scenario
    let env = SimEnv::with_seed(seed.wrapping_add(u64::from(spec.config.id)))
        .with_script(spec.script.iter().copied());
    match spec.fixed_draw {
        Some(draw) => env.with_fixed_draw(draw),
        None => env,
    }
}

/// What one machine did during a scenario.
#[derive(Debug, Clone)]
pub struct MachineRun {
    /// Machine id.
    pub id: MachineId,
    /// Startup metadata, if the machine started.
    pub info: Option<MachineInfo>,
    /// Records in tick order.
    pub records: Vec<EventRecord>,
}

/// Records of every machine after a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    machines: Vec<MachineRun>,
}

impl ScenarioOutcome {
    /// Machine ids in the order they were started.
    pub fn ids(&self) -> Vec<MachineId> {
        self.machines.iter().map(|m| m.id).collect()
    }

    /// Per-machine results.
    pub fn machines(&self) -> &[MachineRun] {
        &self.machines
    }

    /// Records of machine `id` (empty for unknown ids).
    pub fn records(&self, id: MachineId) -> &[EventRecord] {
        self.machine(id).map_or(&[], |m| m.records.as_slice())
    }

    /// Startup metadata of machine `id`.
    pub fn info(&self, id: MachineId) -> Option<&MachineInfo> {
        self.machine(id).and_then(|m| m.info.as_ref())
    }

    /// Clock values machine `from` sent to machine `to`.
    pub fn sent_to(&self, from: MachineId, to: MachineId) -> Vec<u64> {
        self.records(from)
            .iter()
            .filter(|r| r.recipients().is_some_and(|ids| ids.contains(&to)))
            .map(|r| r.clock)
            .collect()
    }

    fn machine(&self, id: MachineId) -> Option<&MachineRun> {
        self.machines.iter().find(|m| m.id == id)
    }
}

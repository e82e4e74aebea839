//! Skewclock simulation binary.
//!
//! # Usage
//!
//! ```bash
//! # Five one-minute runs of three machines, logs under ./logs
//! skewclock-node
//!
//! # One short run with debug diagnostics
//! skewclock-node --runs 1 --duration-secs 10 --log-level debug
//! ```

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use skewclock_node::{ClusterConfig, run_simulation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Lamport clock cluster simulation
#[derive(Parser, Debug)]
#[command(name = "skewclock-node")]
#[command(about = "Simulate machines with skewed clocks exchanging Lamport timestamps")]
#[command(version)]
struct Args {
    /// Machines per run
    #[arg(short, long, default_value = "3")]
    machines: u16,

    /// Number of sequential runs
    #[arg(short, long, default_value = "5")]
    runs: u32,

    /// Length of each run in seconds
    #[arg(short, long, default_value = "60")]
    duration_secs: u64,

    /// Host every machine binds and dials
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Machine N listens on base-port + N
    #[arg(long, default_value = "5000")]
    base_port: u16,

    /// Directory for per-machine event logs
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Pause between runs in seconds, so ports are released
    #[arg(long, default_value = "3")]
    pause_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!(
        machines = args.machines,
        runs = args.runs,
        duration_secs = args.duration_secs,
        "skewclock starting"
    );

    let duration = Duration::from_secs(args.duration_secs);
    for run_id in 1..=args.runs {
        let config = ClusterConfig {
            machines: args.machines,
            host: args.host.clone(),
            base_port: args.base_port,
            log_dir: args.log_dir.clone(),
            run_id,
            ..ClusterConfig::default()
        };

        tracing::info!("Starting simulation run {}/{}", run_id, args.runs);
        run_simulation(&config, duration).await?;
        tracing::info!("Run {} complete, logs in {}", run_id, args.log_dir.display());

        if run_id < args.runs {
            tokio::time::sleep(Duration::from_secs(args.pause_secs)).await;
        }
    }

    tracing::info!("All {} runs complete", args.runs);
    Ok(())
}

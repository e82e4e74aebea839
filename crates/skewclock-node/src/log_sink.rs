//! Per-machine text log files.
//!
//! ```text
//! ============= VM0 LOG START =============
//! Clock rate: 3 ticks per second
//! Peers: [1, 2]
//!
//! Sent: 1 | System time: 1700000000.000000 | Logical Clock Time: 1 | Recipients: [1]
//! Received: 4 | System time: 1700000000.333333 | Logical Clock Time: 5 | Message Queue Length: 0
//! Internal event | System time: 1700000000.666666 | Logical Clock Time: 6
//!
//! ============= VM LOG END =============
//! ```
//!
//! Every line is flushed as soon as it is written so a killed process still
//! leaves a usable log. Write failures are reported through `tracing` and
//! never reach the scheduler.

use std::{
    fmt::Write as _,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use skewclock_core::{EventKind, EventRecord, EventSink, MachineId, MachineInfo};

/// Log file path for machine `id` in simulation run `run_id`.
pub fn log_path(dir: &Path, run_id: u32, id: MachineId) -> PathBuf {
    dir.join(format!("sim{run_id}_vm{id}_log.txt"))
}

/// Seconds since the Unix epoch with microsecond precision.
pub fn format_timestamp(timestamp: SystemTime) -> String {
    // pre-epoch clocks print as zero
    let since = timestamp.duration_since(UNIX_EPOCH).unwrap_or_default();
    format!("{}.{:06}", since.as_secs(), since.subsec_micros())
}

fn format_ids(ids: &[MachineId]) -> String {
    let mut out = String::from("[");
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{id}");
    }
    out.push(']');
    out
}

/// Header block written once at startup.
pub fn format_header(info: &MachineInfo) -> String {
    format!(
        "============= VM{} LOG START =============\nClock rate: {} ticks per second\nPeers: {}\n\n",
        info.id,
        info.clock_rate.get(),
        format_ids(&info.peers)
    )
}

/// Footer written when the scheduler stops.
pub const FOOTER: &str = "\n============= VM LOG END =============\n";

/// One log line, without the trailing newline.
pub fn format_record(record: &EventRecord) -> String {
    let ts = format_timestamp(record.timestamp);
    match &record.kind {
        EventKind::Receive { value } => format!(
            "Received: {value} | System time: {ts} | Logical Clock Time: {} | Message Queue Length: {}",
            record.clock, record.queue_len
        ),
        EventKind::Send { recipients } => format!(
            "Sent: {clock} | System time: {ts} | Logical Clock Time: {clock} | Recipients: {}",
            format_ids(recipients),
            clock = record.clock
        ),
        EventKind::Internal => {
            format!("Internal event | System time: {ts} | Logical Clock Time: {}", record.clock)
        },
    }
}

/// [`EventSink`] writing the text format to a file.
#[derive(Debug)]
pub struct TextLogSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl TextLogSink {
    /// Create (or truncate) `path`, creating parent directories as needed.
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(&path)?);
        Ok(Self { path, writer })
    }

    /// File being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_flushed(&mut self, text: &str) {
        let result = self.writer.write_all(text.as_bytes()).and_then(|()| self.writer.flush());
        if let Err(e) = result {
            tracing::error!(path = %self.path.display(), error = %e, "failed to write event log");
        }
    }
}

impl EventSink for TextLogSink {
    fn started(&mut self, info: &MachineInfo) {
        let header = format_header(info);
        self.write_flushed(&header);
    }

    fn record(&mut self, record: &EventRecord) {
        let mut line = format_record(record);
        line.push('\n');
        self.write_flushed(&line);
    }

    fn finished(&mut self) {
        self.write_flushed(FOOTER);
    }
}

//! Progress reporting for check runs
//!
//! Human mode prints plain lines on stdout. JSON mode writes one message per
//! line on stderr so callers can follow a run without parsing free text.

use serde::Serialize;
use std::io::Write;
use std::time::{Duration, Instant};

use crate::config::{UPDATE_MB_INTERVAL, UPDATE_SEC_INTERVAL};
use crate::models::{AggregateStats, Outcome};

const MIB: f64 = 1024.0 * 1024.0;

/// Where progress goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Plain text on stdout
    #[default]
    Human,
    /// JSON messages on stderr
    Json,
    /// Nothing is printed
    Quiet,
}

/// Progress message sent during a run
#[derive(Debug, Clone, Serialize)]
pub struct ProgressMessage {
    /// Message type identifier ("p" for progress)
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Milliseconds since the run started
    pub ms: u64,
    /// Files processed
    #[serde(rename = "f")]
    pub processed: u64,
    /// Bad files found
    #[serde(rename = "b")]
    pub bad: u64,
    /// MiB processed
    pub mb: f64,
    /// MiB per second since the start
    pub mb_s: f64,
    /// Files per second since the start
    pub files_s: f64,
}

/// Sent as soon as a bad file arrives
#[derive(Debug, Clone, Serialize)]
pub struct BadFileMessage {
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    pub seq: u64,
    pub path: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Rates derived from the running totals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
    pub processed_mb: f64,
    pub mb_per_sec: f64,
    pub files_per_sec: f64,
}

impl Throughput {
    /// Rates over `elapsed` since the run started
    pub fn compute(stats: &AggregateStats, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64().max(f64::EPSILON);
        let processed_mb = stats.total_bytes as f64 / MIB;
        Self {
            processed_mb,
            mb_per_sec: processed_mb / secs,
            files_per_sec: stats.processed as f64 / secs,
        }
    }
}

/// Progress logger throttled by both elapsed time and bytes processed.
///
/// A non-forced line is only printed when at least `min_bytes` were processed
/// since the previous line AND more than `min_interval` has passed.
pub struct ThrottledLogger {
    mode: OutputMode,
    min_interval: Duration,
    min_bytes: u64,
    last_time: Instant,
    last_bytes: u64,
    seq: u64,
}

impl ThrottledLogger {
    /// Logger with the default thresholds (5 s and 500 MiB)
    pub fn new(mode: OutputMode) -> Self {
        Self::with_thresholds(
            mode,
            Duration::from_secs(UPDATE_SEC_INTERVAL),
            UPDATE_MB_INTERVAL * 1024 * 1024,
        )
    }

    /// Logger with custom thresholds
    pub fn with_thresholds(mode: OutputMode, min_interval: Duration, min_bytes: u64) -> Self {
        Self {
            mode,
            min_interval,
            min_bytes,
            last_time: Instant::now(),
            last_bytes: 0,
            seq: 0,
        }
    }

    /// Whether a line would be printed for `total_bytes` right now
    pub fn should_emit(&self, total_bytes: u64, force: bool) -> bool {
        if force {
            return true;
        }
        total_bytes.saturating_sub(self.last_bytes) >= self.min_bytes
            && self.last_time.elapsed() > self.min_interval
    }

    /// Print a progress line if the throttle allows it.
    ///
    /// Returns true if a line was emitted.
    pub fn log(&mut self, stats: &AggregateStats, force: bool) -> bool {
        if !self.should_emit(stats.total_bytes, force) {
            return false;
        }
        self.last_time = Instant::now();
        self.last_bytes = stats.total_bytes;

        let elapsed = stats.start_time.elapsed();
        let rate = Throughput::compute(stats, elapsed);
        match self.mode {
            OutputMode::Human => {
                println!(
                    "Number of bad/processed files: {} / {}, size of processed files: {:.1} MB",
                    stats.bad, stats.processed, rate.processed_mb
                );
                println!(
                    "Processing speed: {:.1} MB/s, or {:.1} files/s",
                    rate.mb_per_sec, rate.files_per_sec
                );
            }
            OutputMode::Json => {
                let msg = ProgressMessage {
                    msg_type: "p",
                    seq: self.next_seq(),
                    ms: elapsed.as_millis() as u64,
                    processed: stats.processed,
                    bad: stats.bad,
                    mb: rate.processed_mb,
                    mb_s: rate.mb_per_sec,
                    files_s: rate.files_per_sec,
                };
                output_to_stderr(&msg);
            }
            OutputMode::Quiet => {}
        }
        true
    }

    /// Report a bad file immediately (never throttled)
    pub fn report_bad(&mut self, outcome: &Outcome) {
        let error = outcome.error.clone().unwrap_or_default();
        match self.mode {
            OutputMode::Human => println!(
                "Bad file: {}, error detail: {}, size[bytes]: {}",
                outcome.path.display(),
                error,
                outcome.size_display()
            ),
            OutputMode::Json => {
                let msg = BadFileMessage {
                    msg_type: "bad",
                    seq: self.next_seq(),
                    path: outcome.path.to_string_lossy().to_string(),
                    error,
                    size: outcome.size,
                };
                output_to_stderr(&msg);
            }
            OutputMode::Quiet => {}
        }
    }

    /// Announce the end of collection and print the final forced line
    pub fn finish(&mut self, stats: &AggregateStats) {
        if self.mode == OutputMode::Human {
            println!("\n**Task completed**\n");
        }
        self.log(stats, true);
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }
}

/// Output a serializable message to stderr as JSON
pub fn output_to_stderr<T: Serialize>(msg: &T) {
    if let Ok(json) = serde_json::to_string(msg) {
        eprintln!("{}", json);
        std::io::stderr().flush().ok();
    }
}

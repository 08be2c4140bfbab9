//! Parallel integrity checker for media files
//!
//! This library scans a directory for images, audio and video, checks each
//! file on a fixed pool of worker threads and aggregates the verdicts into
//! statistics and an optional CSV report of bad files.

pub mod checker;
pub mod collector;
pub mod config;
pub mod error;
pub mod models;
pub mod pool;
pub mod probes;
pub mod progress;
pub mod report;
pub mod runner;
pub mod scanner;

pub use checker::{Check, Checker, ProbeSet};
pub use collector::{CollectionEnd, Collected, ResultCollector};
pub use config::{CheckConfig, ErrorDetect, ToolPaths};
pub use error::{ProbeError, ScanError, ScanErrorKind};
pub use models::{AggregateStats, Category, FailureRecord, Outcome, RunSummary, Task};
pub use pool::{TaskQueue, WorkerPool};
pub use progress::{OutputMode, ThrottledLogger};
pub use report::write_report;
pub use runner::{check_directory, check_directory_with, check_file};
pub use scanner::scan;

//! Run driver - ties scanning, the worker pool, collection and reporting together

use chrono::Local;
use crossbeam_channel::unbounded;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::checker::{Check, Checker};
use crate::collector::ResultCollector;
use crate::config::CheckConfig;
use crate::error::ScanError;
use crate::models::{Outcome, RunSummary, Task};
use crate::pool::{TaskQueue, WorkerPool};
use crate::progress::{OutputMode, ThrottledLogger};
use crate::report::write_report;
use crate::scanner::scan;

/// Check one file; the category comes from its extension
pub fn check_file(path: &Path, config: &CheckConfig) -> Outcome {
    Checker::new(config).check(&Task::new(path.to_path_buf()))
}

/// Check every matching file under `root` with the configured probes
pub fn check_directory(
    root: &Path,
    config: &CheckConfig,
    mode: OutputMode,
) -> Result<RunSummary, ScanError> {
    check_directory_with(root, config, Arc::new(Checker::new(config)), mode)
}

/// Check every matching file under `root` with a caller-supplied checker.
///
/// The task list is built completely, then the workers start, then outcomes
/// are collected until all arrived or a wait timed out.
pub fn check_directory_with(
    root: &Path,
    config: &CheckConfig,
    checker: Arc<dyn Check>,
    mode: OutputMode,
) -> Result<RunSummary, ScanError> {
    let started_at = Local::now();
    let start = Instant::now();

    let tasks = scan(root, config.recursive, &config.allowed_extensions())?;
    let queue = TaskQueue::new();
    let scheduled = queue.populate(tasks);
    log::info!("Scheduled {} files for checking", scheduled);

    let pool = WorkerPool::new(config.effective_threads())?;
    let (outcome_tx, outcome_rx) = unbounded();
    pool.start(&queue, checker, &outcome_tx, config.poll_window);
    drop(outcome_tx);

    let mut logger = ThrottledLogger::new(mode);
    let collected = ResultCollector::new(&outcome_rx, config.timeout(), &mut logger)
        .since(start)
        .collect(scheduled);
    logger.finish(&collected.stats);

    let stats = &collected.stats;
    if stats.bad > 0 {
        if let Some(csv_path) = &config.csv_path {
            if mode == OutputMode::Human {
                println!(
                    "\nSave details for bad files in CSV format, file path: {}",
                    csv_path.display()
                );
            }
            write_report(csv_path, &collected.failures)?;
        }
    }

    Ok(RunSummary {
        root: root.to_path_buf(),
        started_at,
        scheduled: scheduled as u64,
        processed: stats.processed,
        bad: stats.bad,
        total_bytes: stats.total_bytes,
        incomplete: collected.is_partial(),
        duration_ms: start.elapsed().as_millis() as u64,
        failures: collected.failures,
    })
}

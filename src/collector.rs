//! Result collection - the single consumer of worker outcomes

use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::models::{AggregateStats, FailureRecord, Outcome};
use crate::progress::ThrottledLogger;

/// Why collection stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionEnd {
    /// Every expected outcome arrived
    Complete,
    /// No outcome arrived within the timeout
    TimedOut,
    /// Every worker exited while outcomes were still missing
    WorkersGone,
}

/// What the collector gathered
#[derive(Debug, Clone)]
pub struct Collected {
    pub stats: AggregateStats,
    pub failures: Vec<FailureRecord>,
    pub end: CollectionEnd,
}

impl Collected {
    /// Whether collection stopped before every outcome arrived
    pub fn is_partial(&self) -> bool {
        self.end != CollectionEnd::Complete
    }
}

/// Consumes worker outcomes and keeps the running totals
pub struct ResultCollector<'a> {
    outcomes: &'a Receiver<Outcome>,
    timeout: Duration,
    logger: &'a mut ThrottledLogger,
    start: Instant,
}

impl<'a> ResultCollector<'a> {
    pub fn new(
        outcomes: &'a Receiver<Outcome>,
        timeout: Duration,
        logger: &'a mut ThrottledLogger,
    ) -> Self {
        Self {
            outcomes,
            timeout,
            logger,
            start: Instant::now(),
        }
    }

    /// Measure throughput from `start` instead of from collection start
    pub fn since(mut self, start: Instant) -> Self {
        self.start = start;
        self
    }

    /// Receive up to `expected` outcomes, each wait bounded by the timeout.
    ///
    /// Stops early on a timeout or when every worker is gone; whatever was
    /// received so far is kept.
    pub fn collect(self, expected: usize) -> Collected {
        let mut stats = AggregateStats::since(self.start);
        let mut failures = Vec::new();
        let mut end = CollectionEnd::Complete;

        for _ in 0..expected {
            let outcome = match self.outcomes.recv_timeout(self.timeout) {
                Ok(outcome) => outcome,
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!(
                        "Waiting other results for too much time, perhaps you have to raise the timeout"
                    );
                    end = CollectionEnd::TimedOut;
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    log::warn!("All workers stopped before every result arrived");
                    end = CollectionEnd::WorkersGone;
                    break;
                }
            };

            stats.record(&outcome);
            if let Some(record) = FailureRecord::from_outcome(&outcome) {
                self.logger.report_bad(&outcome);
                failures.push(record);
            }
            self.logger.log(&stats, false);
        }

        Collected {
            stats,
            failures,
            end,
        }
    }
}

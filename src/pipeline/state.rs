//! Batch counters and the snapshots derived from them.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Running totals of a batch.
///
/// Counters only grow and tokens are only appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchState {
    processed: usize,
    succeeded: usize,
    failed: usize,
    tokens: Vec<String>,
}

impl BatchState {
    /// Creates an all-zero state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a collected token.
    pub fn record_success(&mut self, token: String) {
        self.processed += 1;
        self.succeeded += 1;
        self.tokens.push(token);
    }

    /// Records a pair that produced no token.
    pub fn record_failure(&mut self) {
        self.processed += 1;
        self.failed += 1;
    }

    #[must_use]
    pub const fn processed(&self) -> usize {
        self.processed
    }

    #[must_use]
    pub const fn succeeded(&self) -> usize {
        self.succeeded
    }

    #[must_use]
    pub const fn failed(&self) -> usize {
        self.failed
    }

    /// Tokens collected so far, in processing order.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Takes a read-only view of the state against the batch bound.
    ///
    /// The percentage is truncated to a whole number and capped at 100.
    #[must_use]
    pub fn snapshot(&self, bound: usize) -> ProgressSnapshot<'_> {
        let percent = if bound == 0 {
            0
        } else {
            (self.processed * 100 / bound).min(100)
        };

        ProgressSnapshot {
            percent_complete: u8::try_from(percent).unwrap_or(100),
            processed: self.processed,
            succeeded: self.succeeded,
            failed: self.failed,
            tokens: &self.tokens,
        }
    }
}

/// Progress of a batch at one point in time.
///
/// Borrows the token list from the running state instead of copying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot<'a> {
    /// Share of the bound processed so far, 0 to 100.
    pub percent_complete: u8,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Tokens collected up to this snapshot.
    pub tokens: &'a [String],
}

/// Final result of a batch run.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub state: BatchState,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl BatchSummary {
    /// Whole seconds the batch took.
    #[must_use]
    pub const fn elapsed_secs(&self) -> u64 {
        self.elapsed.as_secs()
    }
}

//! Batch runner.
//!
//! A run is a pull-based sequence:
//! 1. Take the first `bound` credential pairs (clamped to the input length)
//! 2. For each pair, skip the remote call if the pair is incomplete
//!    (counted as a failure), otherwise fetch a token
//! 3. Record the outcome and hand back a snapshot
//! 4. Once the pairs are exhausted, return `None` forever
//!
//! A zero bound, or raw input that cannot be loaded, yields exactly one
//! all-zero snapshot.

use std::iter::Take;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::{BatchState, BatchSummary, ProgressSnapshot};
use crate::credentials::{CredentialPair, CredentialSource};
use crate::remote::{FetchOutcome, TokenClient};

/// Drives token requests for credential batches.
#[derive(Debug)]
pub struct BatchPipeline<C> {
    client: C,
}

impl<C: TokenClient> BatchPipeline<C> {
    /// Creates a pipeline over the given token client.
    #[must_use]
    pub const fn new(client: C) -> Self {
        Self { client }
    }

    /// Starts a run over the first `bound` pairs.
    ///
    /// Each call starts from a fresh state.
    pub fn run(&self, credentials: Vec<CredentialPair>, bound: usize) -> BatchRun<'_, C> {
        let bound = bound.min(credentials.len());
        info!("Starting batch of {} credential pairs", bound);

        BatchRun {
            client: &self.client,
            pending: credentials.into_iter().take(bound),
            bound,
            state: BatchState::new(),
            exhausted: false,
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Loads raw uploaded bytes and starts a run over them.
    ///
    /// Input that cannot be loaded produces a run with a zero bound.
    pub fn run_raw(&self, raw: &[u8], bound: usize) -> BatchRun<'_, C> {
        match CredentialSource::load(raw) {
            Ok(credentials) => self.run(credentials, bound),
            Err(e) => {
                warn!("Could not load credentials for batch: {}", e);
                self.run(Vec::new(), 0)
            }
        }
    }
}

/// One in-progress batch. Not restartable.
#[derive(Debug)]
pub struct BatchRun<'a, C> {
    client: &'a C,
    pending: Take<std::vec::IntoIter<CredentialPair>>,
    bound: usize,
    state: BatchState,
    exhausted: bool,
    started: Instant,
    started_at: chrono::DateTime<Utc>,
}

impl<C: TokenClient> BatchRun<'_, C> {
    /// Number of pairs this run will process.
    #[must_use]
    pub const fn bound(&self) -> usize {
        self.bound
    }

    /// Current totals.
    #[must_use]
    pub const fn state(&self) -> &BatchState {
        &self.state
    }

    /// Processes the next pair and returns the resulting snapshot.
    ///
    /// Returns `None` once the run is finished.
    pub async fn next_snapshot(&mut self) -> Option<ProgressSnapshot<'_>> {
        if self.exhausted {
            return None;
        }

        if self.bound == 0 {
            self.exhausted = true;
            return Some(self.state.snapshot(0));
        }

        let Some(pair) = self.pending.next() else {
            self.exhausted = true;
            return None;
        };

        self.process(&pair).await;
        Some(self.state.snapshot(self.bound))
    }

    /// Processes any remaining pairs and returns the final result.
    pub async fn finish(mut self) -> BatchSummary {
        while self.next_snapshot().await.is_some() {}

        let summary = BatchSummary {
            elapsed: self.started.elapsed(),
            started_at: self.started_at,
            finished_at: Utc::now(),
            state: self.state,
        };

        info!(
            "Batch started {} finished {}: {} succeeded, {} failed in {}s",
            summary.started_at.format("%H:%M:%S"),
            summary.finished_at.format("%H:%M:%S"),
            summary.state.succeeded(),
            summary.state.failed(),
            summary.elapsed_secs()
        );

        summary
    }

    async fn process(&mut self, pair: &CredentialPair) {
        if !pair.is_valid() {
            debug!("Skipping incomplete credential pair {}", pair.masked_identifier());
            self.state.record_failure();
            return;
        }

        debug!("Requesting token for {}", pair.masked_identifier());
        match self.client.fetch(pair.identifier(), pair.secret()).await {
            FetchOutcome::Success { token } => self.state.record_success(token),
            FetchOutcome::Failure { reason } => {
                debug!("No token for {}: {}", pair.masked_identifier(), reason);
                self.state.record_failure();
            }
        }
    }
}

//! Pacing for progress message edits.
//!
//! Chat services reject bursts of edits to the same message, so progress
//! updates wait out a minimum interval between edits.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::trace;

/// Enforces a minimum interval between edits.
#[derive(Debug)]
pub struct EditThrottle {
    /// Minimum duration between edits.
    min_interval: Duration,

    /// Last time an edit was let through.
    last_edit: Mutex<Option<Instant>>,
}

impl EditThrottle {
    /// Creates a throttle with the specified minimum interval.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_edit: Mutex::new(None),
        }
    }

    /// Waits until an edit is allowed, then marks it as performed.
    ///
    /// Returns the duration waited (0 if no wait was needed).
    pub async fn wait_and_acquire(&self) -> Duration {
        let mut last = self.last_edit.lock().await;

        let wait_duration = last.map_or(Duration::ZERO, |last_time| {
            self.min_interval.saturating_sub(last_time.elapsed())
        });

        if !wait_duration.is_zero() {
            trace!("Throttling progress edit for {:?}", wait_duration);
            tokio::time::sleep(wait_duration).await;
        }

        *last = Some(Instant::now());
        wait_duration
    }
}

//! Sequential batch pipeline.
//!
//! Walks a bounded list of credential pairs, requests one token per pair
//! and reports progress after every pair.

mod runner;
mod state;

pub use runner::{BatchPipeline, BatchRun};
pub use state::{BatchState, BatchSummary, ProgressSnapshot};

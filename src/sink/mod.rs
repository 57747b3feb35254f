//! Token artifact output.
//!
//! Writes collected tokens to a JSON file that is delivered to the user
//! and then removed.

mod artifact;

pub use artifact::{ResultSink, SinkError, TokenRecord};

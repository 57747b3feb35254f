//! Token Batch Bot Library
//!
//! A chat bot that exchanges uploaded credential pairs for tokens.
//!
//! This crate provides the core functionality for:
//! - Loading and counting credential records from uploaded JSON files
//! - Requesting one token per credential pair from the token service
//! - Running bounded, sequential batches with progress snapshots
//! - Writing collected tokens to a deliverable JSON file
//! - Driving the per-user chat conversation around a batch

pub mod config;
pub mod console;
pub mod credentials;
pub mod pipeline;
pub mod remote;
pub mod session;
pub mod sink;

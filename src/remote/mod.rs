//! Remote token service client.
//!
//! Exchanges one credential pair for one token per request and classifies
//! every failure instead of returning it as an error.

mod client;

pub use client::{
    FetchFailure, FetchOutcome, HttpTokenClient, TOKEN_FIELD, TokenClient, TokenClientError,
};

//! Credential input handling.
//!
//! Parses uploaded JSON files of `uid`/`password` records into
//! credential pairs and counts how many of them are usable.

mod source;

pub use source::{
    CredentialError, CredentialPair, CredentialSource, CredentialSummary, RecordStatus, SkipReason,
};

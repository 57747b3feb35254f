//! Credential records parsed from an uploaded JSON array.

use std::borrow::Cow;
use std::fmt;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while reading a credentials file.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Credentials file is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Credentials file must contain a JSON array of records")]
    NotAnArray,
}

/// An identifier/secret pair used to request a token.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    identifier: String,
    secret: String,
}

impl CredentialPair {
    /// Creates a new credential pair.
    #[must_use]
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// A pair is usable only when both fields are non-empty.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.identifier.is_empty() && !self.secret.is_empty()
    }

    /// Identifier masked for logs and listings (last four characters).
    #[must_use]
    pub fn masked_identifier(&self) -> String {
        mask(&self.identifier)
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("identifier", &self.masked_identifier())
            .finish_non_exhaustive()
    }
}

/// Record counts of a credentials file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialSummary {
    /// Number of records in the array.
    pub total: usize,
    /// Records with both `uid` and `password` present and non-empty.
    pub valid: usize,
}

/// Why a record cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingUid,
    MissingPassword,
    MissingBoth,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingUid => write!(f, "missing uid"),
            Self::MissingPassword => write!(f, "missing password"),
            Self::MissingBoth => write!(f, "missing uid and password"),
        }
    }
}

/// Outcome of checking one record of a credentials file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    Usable(CredentialPair),
    Skipped {
        /// Masked uid, when the record has one.
        uid: Option<String>,
        reason: SkipReason,
    },
}

impl RecordStatus {
    fn check(record: &Value) -> Self {
        match (field(record, "uid"), field(record, "password")) {
            (Some(uid), Some(password)) => Self::Usable(CredentialPair::new(uid, password)),
            (Some(uid), None) => Self::Skipped {
                uid: Some(mask(&uid)),
                reason: SkipReason::MissingPassword,
            },
            (None, Some(_)) => Self::Skipped {
                uid: None,
                reason: SkipReason::MissingUid,
            },
            (None, None) => Self::Skipped {
                uid: None,
                reason: SkipReason::MissingBoth,
            },
        }
    }

    #[must_use]
    pub const fn is_usable(&self) -> bool {
        matches!(self, Self::Usable(_))
    }
}

/// Reads credential pairs from raw uploaded bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialSource;

impl CredentialSource {
    /// Parses the input and returns the valid credential pairs in file order.
    ///
    /// Records missing either field are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a JSON array.
    pub fn load(raw: &[u8]) -> Result<Vec<CredentialPair>, CredentialError> {
        let records = Self::inspect(raw)?;
        let total = records.len();

        let pairs: Vec<CredentialPair> = records
            .into_iter()
            .filter_map(|status| match status {
                RecordStatus::Usable(pair) => Some(pair),
                RecordStatus::Skipped { .. } => None,
            })
            .collect();

        debug!("Loaded {} of {} credential records", pairs.len(), total);
        Ok(pairs)
    }

    /// Counts valid records, returning 0 when the input cannot be parsed.
    #[must_use]
    pub fn count_valid(raw: &[u8]) -> usize {
        Self::summarize(raw).map_or(0, |summary| summary.valid)
    }

    /// Returns the total and valid record counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a JSON array.
    pub fn summarize(raw: &[u8]) -> Result<CredentialSummary, CredentialError> {
        let records = Self::inspect(raw)?;
        let valid = records.iter().filter(|status| status.is_usable()).count();

        Ok(CredentialSummary {
            total: records.len(),
            valid,
        })
    }

    /// Checks every record in file order, usable or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a JSON array.
    pub fn inspect(raw: &[u8]) -> Result<Vec<RecordStatus>, CredentialError> {
        let records = parse_records(raw)?;
        Ok(records.iter().map(RecordStatus::check).collect())
    }
}

fn parse_records(raw: &[u8]) -> Result<Vec<Value>, CredentialError> {
    match serde_json::from_slice::<Value>(raw)? {
        Value::Array(records) => Ok(records),
        _ => Err(CredentialError::NotAnArray),
    }
}

/// Reads a field as text. Numbers are accepted since uids are often numeric;
/// empty strings, zero, null and other types count as missing.
fn field<'a>(record: &'a Value, key: &str) -> Option<Cow<'a, str>> {
    match record.get(key)? {
        Value::String(s) if !s.is_empty() => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(Cow::Owned(n.to_string())),
        _ => None,
    }
}

fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 4 {
        format!("***{}", chars[chars.len() - 4..].iter().collect::<String>())
    } else {
        "****".to_owned()
    }
}

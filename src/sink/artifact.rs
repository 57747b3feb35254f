//! JSON token artifact.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;

/// Default artifact file name.
const DEFAULT_FILE_NAME: &str = "token_ind.json";

/// Errors that can occur while writing or reading an artifact.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Error saving tokens to {}: {message}", .path.display())]
    Write { path: PathBuf, message: String },

    #[error("Error reading tokens from {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },
}

/// One entry of the output artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token: String,
}

impl From<String> for TokenRecord {
    fn from(token: String) -> Self {
        Self { token }
    }
}

/// Serializes tokens to a JSON artifact at a fixed location.
#[derive(Debug, Clone)]
pub struct ResultSink {
    path: PathBuf,
}

impl Default for ResultSink {
    fn default() -> Self {
        Self::new(DEFAULT_FILE_NAME)
    }
}

impl ResultSink {
    /// Creates a sink writing to the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a sink writing `token_<label>.json` inside `dir`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>, label: &str) -> Self {
        Self::new(dir.as_ref().join(format!("token_{label}.json")))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the tokens as a pretty-printed array of `{"token": ...}` records.
    ///
    /// The array is written to a temporary file next to the target and
    /// renamed into place, so a failed save never leaves a partial artifact.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Write`] describing the failure; nothing is raised.
    pub fn save<T>(&self, tokens: &[T]) -> Result<PathBuf, SinkError>
    where
        T: AsRef<str>,
    {
        let records: Vec<TokenRecord> = tokens
            .iter()
            .map(|token| TokenRecord {
                token: token.as_ref().to_owned(),
            })
            .collect();

        let write_err = |message: String| SinkError::Write {
            path: self.path.clone(),
            message,
        };

        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        records
            .serialize(&mut serializer)
            .map_err(|e| write_err(e.to_string()))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir).map_err(|e| write_err(e.to_string()))?;
        file.write_all(&buf).map_err(|e| write_err(e.to_string()))?;
        file.persist(&self.path).map_err(|e| write_err(e.error.to_string()))?;

        info!("Saved {} tokens to {}", records.len(), self.path.display());
        Ok(self.path.clone())
    }

    /// Reads an artifact back.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Read`] if the file is missing or not a token array.
    pub fn load(path: impl AsRef<Path>) -> Result<Vec<TokenRecord>, SinkError> {
        let path = path.as_ref();
        let read_err = |message: String| SinkError::Read {
            path: path.to_path_buf(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| read_err(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| read_err(e.to_string()))
    }
}

//! Error type shared by manifest loading, file helpers and the audit builder.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result alias used across the crate.
pub type AuditResult<T> = Result<T, AuditError>;

/// Failures that abort an audit run.
///
/// Per-asset problems never surface here; the mapper logs them and carries on.
#[derive(Debug, Error)]
pub enum AuditError {
  /// A required input file could not be accessed.
  #[error("file not found: {}", path.display())]
  FileNotFound {
    /// Path that was requested.
    path: PathBuf,
  },
  /// A JSON input existed but did not match the expected shape.
  #[error("failed to parse {}: {source}", path.display())]
  Parse {
    /// Path of the offending file.
    path: PathBuf,
    /// Underlying JSON error.
    source: serde_json::Error,
  },
  /// A value could not be serialised to JSON for writing.
  #[error("failed to serialise json for {}: {source}", path.display())]
  Serialize {
    /// Destination path.
    path: PathBuf,
    /// Underlying JSON error.
    source: serde_json::Error,
  },
  /// A configuration file could not be deserialised.
  #[error("invalid configuration in {}: {message}", path.display())]
  ConfigParse {
    /// Path of the configuration file.
    path: PathBuf,
    /// Parser message.
    message: String,
  },
  /// A manifest did not appear before the polling deadline.
  #[error("file {} not found within {timeout:?}", path.display())]
  WaitTimeout {
    /// Path that was polled.
    path: PathBuf,
    /// Deadline that elapsed.
    timeout: Duration,
  },
  /// Any other I/O failure while reading or writing a file.
  #[error("i/o error on {}: {source}", path.display())]
  Io {
    /// Path involved in the failed operation.
    path: PathBuf,
    /// Underlying I/O error.
    source: std::io::Error,
  },
}

impl AuditError {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    let path = path.into();
    if source.kind() == std::io::ErrorKind::NotFound {
      Self::FileNotFound { path }
    } else {
      Self::Io { path, source }
    }
  }
}

//! Error types for result capture and delivery.
//!
//! All failures in the crate funnel into [`Error`]. The taxonomy follows the
//! operational model: transient failures (shared memory not yet available,
//! collector unreachable) are retryable and never abort the pipeline, while
//! format-version mismatches and startup I/O failures are fatal.
//!
//! ```rust
//! use parcferme::Error;
//!
//! let error = Error::connection_failed("shared memory not available");
//! assert!(error.is_retryable());
//! ```

use std::path::PathBuf;
use thiserror::Error;

#[cfg(windows)]
use windows_core as core;

/// Result type alias for capture and delivery operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for capture and delivery operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Failed to connect to simulation telemetry: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Telemetry format version mismatch: expected {expected}, found {found}")]
    Version { expected: u32, found: u32 },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Upload failed: {reason}")]
    Upload {
        reason: String,
        /// HTTP status when the collector answered with a non-success code.
        status: Option<u16>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Windows API error: {operation}")]
    #[cfg(windows)]
    WindowsApi {
        operation: String,
        #[source]
        source: core::Error,
    },
}

impl Error {
    /// Returns whether this error is expected to clear on retry.
    ///
    /// Connection and upload failures are transient by design: the pipeline
    /// waits a fixed interval and tries again, indefinitely. Version and
    /// parse errors indicate an incompatible producer and never clear.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Connection { .. } => true,
            Error::Upload { .. } => true,
            Error::Version { .. } => false,
            Error::File { .. } => false,
            Error::Parse { .. } => false,
            #[cfg(windows)]
            Error::WindowsApi { .. } => true,
        }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        Error::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Error::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        Error::File { path, source }
    }

    /// Helper constructor for parse errors.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        Error::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for transport-level upload failures.
    pub fn upload_failed(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Error::Upload { reason: reason.into(), status: None, source: Some(source) }
    }

    /// Helper constructor for uploads the collector rejected with a status code.
    pub fn upload_rejected(status: u16) -> Self {
        Error::Upload {
            reason: format!("collector returned HTTP {}", status),
            status: Some(status),
            source: None,
        }
    }

    /// Helper constructor for Windows API errors.
    #[cfg(windows)]
    pub fn windows_api_error(operation: impl Into<String>, source: core::Error) -> Self {
        Error::WindowsApi { operation: operation.into(), source }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Upload { reason: "request failed".to_string(), status: None, source: Some(Box::new(err)) }
    }
}

#[cfg(windows)]
impl From<core::Error> for Error {
    fn from(err: core::Error) -> Self {
        Error::WindowsApi { operation: "Unknown Windows operation".to_string(), source: err }
    }
}

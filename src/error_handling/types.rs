//! Error type definitions.
//!
//! This module defines every error type used throughout the application, plus
//! the error/warning/info categories counted by `ProcessingStats`.
//!
//! Failure scopes:
//! - `ExtractionError`: one source, recoverable (the source is skipped)
//! - `ClassificationError`: one item, recoverable (the item is skipped)
//! - `StorageError`: one flush attempt, retried
//! - `StorageFatalError`: pool timeout, retries exhausted or pool misuse; aborts the run
//! - `PoolMisuseError`: a programming error, never retried

use std::path::PathBuf;
use std::time::Duration;

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

use crate::storage::FailedBatch;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Error types for configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON (or has the wrong shape).
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No websites configured. Please check your config file.")]
    NoSources,

    #[error("No categories configured. Please check your config file.")]
    NoCategories,

    #[error("Invalid source '{name}': {reason}")]
    InvalidSource { name: String, reason: String },

    #[error("Invalid setting: {0}")]
    InvalidSetting(&'static str),

    #[error("confidence_threshold must be within 0.0..=1.0, got {0}")]
    InvalidThreshold(f64),
}

/// Error extracting raw items from one source.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The page request failed (connect, timeout, body read).
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: ReqwestError,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The page exceeded the body size limit.
    #[error("{url} body is {size} bytes, over the {limit} byte limit")]
    BodyTooLarge {
        url: String,
        size: usize,
        limit: usize,
    },

    /// The configured selector does not parse.
    #[error("Invalid CSS selector '{0}'")]
    InvalidSelector(String),
}

impl ExtractionError {
    /// Whether another attempt at the same page could succeed.
    ///
    /// Connection problems, timeouts, 429 and 5xx responses are transient;
    /// other client errors, oversized bodies and bad selectors are not.
    pub fn is_retriable(&self) -> bool {
        match self {
            ExtractionError::Request { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            ExtractionError::Status { status, .. } => *status == 429 || *status >= 500,
            ExtractionError::BodyTooLarge { .. } | ExtractionError::InvalidSelector(_) => false,
        }
    }
}

/// Error classifying one item.
#[derive(Error, Debug)]
pub enum ClassificationError {
    #[error("Classification request failed: {0}")]
    Request(#[from] ReqwestError),

    #[error("Classifier returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed classifier response: {0}")]
    MalformedResponse(String),

    #[error("No candidate labels supplied")]
    NoLabels,
}

/// Error constructing a `Record`.
#[derive(Error, Debug, PartialEq)]
pub enum RecordError {
    #[error("Record field '{0}' cannot be empty")]
    EmptyField(&'static str),

    #[error("Confidence must be a number between 0 and 1, got {0}")]
    ConfidenceOutOfRange(f64),
}

/// Error types for database operations.
///
/// A `StorageError` during a flush is transient: the coordinator retries the
/// whole batch.
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),
}

/// Misuse of the connection pool. Indicates a caller bug; never retried.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PoolMisuseError {
    /// Released a lease whose slot is not leased under that id
    /// (double release, or a lease that was never handed out).
    #[error("Lease {lease_id} on slot {slot} is not currently leased")]
    NotLeased { slot: usize, lease_id: u64 },

    /// The lease names a slot the pool does not have.
    #[error("Lease refers to slot {slot} but the pool only has {capacity} slots")]
    UnknownSlot { slot: usize, capacity: usize },

    #[error("Connection requested after the pool was shut down")]
    AcquireAfterShutdown,
}

/// Error acquiring a pooled connection.
#[derive(Error, Debug)]
pub enum PoolError {
    /// Every slot stayed leased for the whole acquire timeout.
    #[error("Timed out after {waited:?} waiting for a pooled connection")]
    Exhausted { waited: Duration },

    #[error(transparent)]
    Misuse(#[from] PoolMisuseError),
}

/// Storage failures that abort the run.
///
/// Variants that concern a batch carry its records so the caller can decide
/// to skip them or scope a retry-run to the affected sources.
#[derive(Error, Debug)]
pub enum StorageFatalError {
    #[error("Timed out after {waited:?} waiting for a pooled connection; batch {} ({} records) not written", .batch.id, .batch.len())]
    PoolExhausted { waited: Duration, batch: FailedBatch },

    #[error("Batch {} ({} records) failed after {} attempts: {last_error}", .batch.id, .batch.len(), .batch.attempts)]
    RetriesExhausted {
        batch: FailedBatch,
        #[source]
        last_error: StorageError,
    },

    #[error("Connection pool misuse: {error}")]
    Misuse {
        #[source]
        error: PoolMisuseError,
        /// Records that were not written because of the misuse, if any
        unwritten: Option<FailedBatch>,
    },
}

impl StorageFatalError {
    /// The batch whose records were not persisted, if this failure left one.
    pub fn failed_batch(&self) -> Option<&FailedBatch> {
        match self {
            StorageFatalError::PoolExhausted { batch, .. }
            | StorageFatalError::RetriesExhausted { batch, .. } => Some(batch),
            StorageFatalError::Misuse { unwritten, .. } => unwritten.as_ref(),
        }
    }
}

/// Types of errors that can occur during a run.
///
/// These are failures that lose data for one source, item or batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    /// A source could not be fetched or parsed
    ExtractionError,
    /// An item could not be classified
    ClassificationError,
    /// A batch could not be written after all retries
    FlushFailed,
}

/// Types of warnings that can occur during a run.
///
/// Warnings do not lose data on their own but are worth tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum WarningType {
    /// A source produced no items
    EmptySource,
    /// A flush attempt failed and was retried
    FlushRetried,
    /// A low-confidence item was skipped (drop policy)
    LowConfidenceDropped,
}

/// Types of informational metrics that can occur during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum InfoType {
    /// A low-confidence item was stored as `Uncategorized`
    LowConfidenceStored,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::ExtractionError => "Extraction error",
            ErrorType::ClassificationError => "Classification error",
            ErrorType::FlushFailed => "Batch flush failed",
        }
    }
}

impl WarningType {
    /// Returns a human-readable string representation of the warning type.
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningType::EmptySource => "Source produced no items",
            WarningType::FlushRetried => "Flush attempt retried",
            WarningType::LowConfidenceDropped => "Low-confidence item dropped",
        }
    }
}

impl InfoType {
    /// Returns a human-readable string representation of the info type.
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoType::LowConfidenceStored => "Low-confidence item stored as Uncategorized",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_all_error_types_have_string_representation() {
        for error_type in ErrorType::iter() {
            assert!(
                !error_type.as_str().is_empty(),
                "{:?} should have non-empty string",
                error_type
            );
        }
        for warning_type in WarningType::iter() {
            assert!(!warning_type.as_str().is_empty());
        }
        for info_type in InfoType::iter() {
            assert!(!info_type.as_str().is_empty());
        }
    }

    #[test]
    fn test_status_retriability() {
        let server = ExtractionError::Status {
            url: "https://example.com".into(),
            status: 503,
        };
        let throttled = ExtractionError::Status {
            url: "https://example.com".into(),
            status: 429,
        };
        let missing = ExtractionError::Status {
            url: "https://example.com".into(),
            status: 404,
        };
        assert!(server.is_retriable());
        assert!(throttled.is_retriable());
        assert!(!missing.is_retriable());
        assert!(!ExtractionError::InvalidSelector("[".into()).is_retriable());
    }

    #[test]
    fn test_pool_misuse_messages() {
        let err = PoolMisuseError::NotLeased {
            slot: 1,
            lease_id: 7,
        };
        assert_eq!(err.to_string(), "Lease 7 on slot 1 is not currently leased");
        assert_eq!(
            PoolMisuseError::AcquireAfterShutdown.to_string(),
            "Connection requested after the pool was shut down"
        );
    }

    #[test]
    fn test_config_error_read_mentions_path() {
        let err = ConfigError::Read {
            path: PathBuf::from("config.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("config.json"));
    }
}

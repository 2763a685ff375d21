//! Error handling and processing statistics.
//!
//! This module provides:
//! - Error type definitions for every failure scope (source, item, batch, run)
//! - Processing statistics tracking (errors, warnings, info metrics)
//!
//! Counted categories:
//! - **Errors**: Failures that lose a source, an item or a batch
//! - **Warnings**: Events that don't lose data but are worth tracking
//! - **Info**: Informational metrics (low-confidence items kept, ...)

mod stats;
mod types;

// Re-export public API
pub use stats::ProcessingStats;
pub use types::{
    ClassificationError, ConfigError, ErrorType, ExtractionError, InfoType, InitializationError,
    PoolError, PoolMisuseError, RecordError, StorageError, StorageFatalError, WarningType,
};

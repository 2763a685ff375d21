//! Configuration constants.
//!
//! This module defines the defaults and operational limits used throughout the
//! application: batch and pool sizing, retry parameters, network timeouts and
//! extraction limits.

use std::time::Duration;

/// Default SQLite database path (relative to the working directory)
pub const DB_PATH: &str = "./headlines.db";
/// Default configuration file path
pub const CONFIG_PATH: &str = "config.json";

// Batching and pooling
/// Number of buffered records that triggers a flush
pub const DEFAULT_BATCH_SIZE: usize = 50;
/// Number of pooled SQLite connections
pub const DEFAULT_POOL_SIZE: usize = 3;
/// How long a caller waits for a pooled connection before the run is aborted
pub const POOL_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
/// How long `close()` waits for outstanding leases before closing what it has
pub const POOL_CLOSE_TIMEOUT: Duration = Duration::from_secs(30);
/// SQLite busy timeout applied to every pooled connection
pub const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
/// Rows per INSERT statement.
///
/// Each row binds 6 parameters; 150 rows keeps a statement at 900 parameters,
/// under SQLite's historical limit of 999. Larger batches are split across
/// several statements inside the same transaction.
pub const MAX_ROWS_PER_STATEMENT: usize = 150;

// Flush retry strategy
/// Retries after the first failed flush attempt (3 retries = 4 attempts)
pub const FLUSH_MAX_RETRIES: u32 = 3;
/// Delay before the first flush retry
pub const FLUSH_RETRY_INITIAL_DELAY_MS: u64 = 200;
/// Factor by which the flush retry delay grows after each attempt
pub const FLUSH_RETRY_FACTOR: u32 = 2;

// Classification
/// Best-score threshold under which an item is treated as low confidence
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.3;
/// Category stored for low-confidence items
pub const UNCATEGORIZED: &str = "Uncategorized";
/// Default zero-shot inference endpoint
pub const DEFAULT_CLASSIFIER_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/facebook/bart-large-mnli";
/// Timeout for one classification request
pub const CLASSIFY_TIMEOUT: Duration = Duration::from_secs(30);

// Extraction
/// Selectors tried when a source does not configure one
pub const DEFAULT_SELECTORS: &[&str] = &["h1", "h2", "a"];
/// Maximum number of items kept per source
pub const DEFAULT_MAX_ITEMS_PER_SOURCE: usize = 10;
/// Page download timeout
pub const PAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(60);
/// Maximum page body size in bytes (5MB)
pub const MAX_PAGE_BODY_SIZE: usize = 5 * 1024 * 1024;
/// Characters of an item shown in log lines
pub const LOG_SNIPPET_CHARS: usize = 80;

// Page fetch retry strategy
/// Initial delay in milliseconds before the first fetch retry
pub const FETCH_RETRY_INITIAL_DELAY_MS: u64 = 500;
/// Maximum delay between fetch retries in seconds
pub const FETCH_RETRY_MAX_DELAY_SECS: u64 = 10;
/// Maximum number of fetch attempts (including the initial attempt)
pub const FETCH_RETRY_MAX_ATTEMPTS: usize = 3;

/// Default User-Agent string for page downloads.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

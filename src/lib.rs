//! headline_ingest library: batched, pooled ingestion of classified headlines
//!
//! This library scrapes short text items (headlines, video titles) from
//! configured sources, assigns each a category with a zero-shot classifier and
//! stores the results in SQLite. Writes go through a fixed-size connection
//! pool and are grouped into transactional batches.
//!
//! # Example
//!
//! ```no_run
//! use headline_ingest::{run_ingest, Config, SourceConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     sources: vec![SourceConfig {
//!         name: "Example".into(),
//!         url: "https://example.com".into(),
//!         selector: Some("h2".into()),
//!     }],
//!     categories: vec!["Politics".into(), "Sports".into()],
//!     batch_size: 20,
//!     ..Default::default()
//! };
//!
//! let report = run_ingest(config).await?;
//! println!(
//!     "Stored {} records in {} batches",
//!     report.pipeline.rows_committed, report.pipeline.batches_committed
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or call library functions from within an async context.

mod app;
pub mod classify;
pub mod config;
pub mod error_handling;
pub mod extract;
pub mod initialization;
pub mod pipeline;
mod record;
mod run;
pub mod storage;

// Re-export public API
pub use classify::{Classification, Classifier, Verdict, ZeroShotClassifier};
pub use config::{
    ClassifierConfig, Cli, Config, LogFormat, LogLevel, LowConfidencePolicy, SourceConfig,
};
pub use error_handling::{
    ClassificationError, ConfigError, ExtractionError, PoolError, PoolMisuseError,
    ProcessingStats, RecordError, StorageError, StorageFatalError,
};
pub use extract::{Extractor, HtmlExtractor, RawItem};
pub use pipeline::{Pipeline, PipelineAbort, PipelineReport, PipelineSettings};
pub use record::{Record, ScrapeClock};
pub use run::{run_ingest, run_ingest_with, RunReport};
pub use storage::{
    BatchBuffer, BatchConnection, ConnectionPool, DatabaseStats, FailedBatch, FlushReport, Lease,
    RetryPolicy, SqliteBatchConnection, WriteCoordinator,
};

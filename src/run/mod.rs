//! Run orchestration: resources, pipeline, teardown.

mod finalize;
mod resources;

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use crate::classify::{Classifier, ZeroShotClassifier};
use crate::config::Config;
use crate::extract::{Extractor, HtmlExtractor};
use crate::initialization::{init_classifier_client, init_client};
use crate::pipeline::{Pipeline, PipelineReport, PipelineSettings};
use crate::storage::DatabaseStats;

pub use finalize::finalize_run;
pub use resources::{init_resources, IngestResources};

/// Results of an ingest run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Per-source and per-item counts
    pub pipeline: PipelineReport,
    /// Row counts read back from the database after the run, if the read
    /// succeeded
    pub database: Option<DatabaseStats>,
    /// Records left buffered when the pool closed (0 after a clean run)
    pub pending_batch_size: usize,
    pub db_path: PathBuf,
    pub elapsed_seconds: f64,
}

/// Runs an ingest with the HTTP extractor and the zero-shot classifier.
///
/// # Errors
///
/// Fails if the HTTP clients or the database cannot be initialized. A fatal
/// storage error during the run is returned as a `PipelineAbort` inside the
/// `anyhow::Error`, after the pool has been closed:
///
/// ```no_run
/// # async fn example(config: headline_ingest::Config) {
/// use headline_ingest::{run_ingest, PipelineAbort};
///
/// if let Err(e) = run_ingest(config).await {
///     if let Some(abort) = e.downcast_ref::<PipelineAbort>() {
///         eprintln!("{} records not written", abort.unwritten_records());
///     }
/// }
/// # }
/// ```
pub async fn run_ingest(config: Config) -> Result<RunReport> {
    let page_client = init_client(&config).context("Failed to initialize HTTP client")?;
    let classifier_client =
        init_classifier_client(&config).context("Failed to initialize classifier client")?;

    let extractor = HtmlExtractor::new(page_client, config.max_items_per_source);
    let classifier = ZeroShotClassifier::new(classifier_client, &config.classifier);
    run_ingest_with(config, extractor, classifier).await
}

/// Runs an ingest against the configured SQLite database with the given
/// extraction and classification capabilities.
pub async fn run_ingest_with<E, K>(config: Config, extractor: E, classifier: K) -> Result<RunReport>
where
    E: Extractor,
    K: Classifier,
{
    config.validate().context("Invalid configuration")?;
    info!(
        "Starting run: {} source(s), {} categories",
        config.sources.len(),
        config.categories.len()
    );

    let resources = init_resources(config).await?;
    let pipeline = Pipeline::new(
        extractor,
        classifier,
        resources.coordinator.clone(),
        PipelineSettings::from(&resources.config),
    )
    .with_stats(resources.error_stats.clone());

    let outcome = pipeline.run(&resources.config.sources).await;
    drop(pipeline);

    finalize_run(resources, outcome).await
}

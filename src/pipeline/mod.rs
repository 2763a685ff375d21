//! The ingestion pipeline.
//!
//! Drives every configured source through extraction and classification and
//! submits the resulting records to the `WriteCoordinator`:
//! - Up to `workers` sources are processed concurrently
//! - A failing source or item is logged, counted and skipped
//! - A fatal storage error stops new submissions, lets in-flight ones finish,
//!   attempts one final drain and aborts the run
//! - Otherwise the coordinator is drained exactly once after the last source

mod report;
mod source;

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::classify::Classifier;
use crate::config::{Config, LowConfidencePolicy, SourceConfig};
use crate::error_handling::{ProcessingStats, StorageFatalError};
use crate::extract::Extractor;
use crate::record::ScrapeClock;
use crate::storage::{BatchConnection, WriteCoordinator};

pub use report::{PipelineAbort, PipelineReport};

/// Classification settings the pipeline applies to every item.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub categories: Vec<String>,
    pub confidence_threshold: f64,
    pub low_confidence_policy: LowConfidencePolicy,
    /// Sources processed concurrently (at least 1)
    pub workers: usize,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        PipelineSettings {
            categories: config.categories.clone(),
            confidence_threshold: config.confidence_threshold,
            low_confidence_policy: config.low_confidence_policy,
            workers: config.workers,
        }
    }
}

/// Source -> extraction -> classification -> storage.
pub struct Pipeline<E, K, C: BatchConnection> {
    extractor: E,
    classifier: K,
    coordinator: Arc<WriteCoordinator<C>>,
    settings: PipelineSettings,
    clock: ScrapeClock,
    stats: Arc<ProcessingStats>,
}

impl<E, K, C> Pipeline<E, K, C>
where
    E: Extractor,
    K: Classifier,
    C: BatchConnection,
{
    pub fn new(
        extractor: E,
        classifier: K,
        coordinator: Arc<WriteCoordinator<C>>,
        settings: PipelineSettings,
    ) -> Self {
        Pipeline {
            extractor,
            classifier,
            coordinator,
            settings,
            clock: ScrapeClock::new(),
            stats: Arc::new(ProcessingStats::new()),
        }
    }

    /// Shares a run-wide statistics tracker.
    pub fn with_stats(mut self, stats: Arc<ProcessingStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> &Arc<ProcessingStats> {
        &self.stats
    }

    /// Processes every source, then drains the coordinator.
    ///
    /// # Errors
    ///
    /// `PipelineAbort` when a flush failed fatally. It carries the fatal
    /// error (with the unwritten records) and the counts up to that point.
    pub async fn run(&self, sources: &[SourceConfig]) -> Result<PipelineReport, PipelineAbort> {
        let started = Instant::now();
        let before = self.coordinator.stats();
        let workers = self.settings.workers.max(1);
        let abort = CancellationToken::new();

        info!(
            "Processing {} source(s) with {} worker(s)",
            sources.len(),
            workers
        );

        let mut report = PipelineReport {
            sources_total: sources.len(),
            ..Default::default()
        };
        let mut fatal: Vec<StorageFatalError> = Vec::new();

        // The stream is polled to completion even after an abort so that
        // submissions already in flight finish instead of being dropped.
        let mut outcomes = stream::iter(sources)
            .map(|source| self.process_source(source, &abort))
            .buffer_unordered(workers);
        while let Some(mut outcome) = outcomes.next().await {
            report.absorb(&outcome);
            if let Some(error) = outcome.fatal.take() {
                fatal.push(error);
            }
        }
        drop(outcomes);

        let drained = self.coordinator.drain().await;

        let after = self.coordinator.stats();
        report.batches_committed = after.batches_committed - before.batches_committed;
        report.rows_committed = after.rows_committed - before.rows_committed;
        report.elapsed = started.elapsed();

        match drained {
            Ok(Some(flush)) => debug!("Final drain wrote {} row(s)", flush.rows),
            Ok(None) => {}
            Err(e) => {
                error!("Final drain failed: {e}");
                fatal.push(e);
            }
        }

        let mut errors = fatal.into_iter();
        match errors.next() {
            None => {
                info!(
                    "Pipeline finished: {} record(s) in {} batch(es) from {} source(s) ({} failed)",
                    report.rows_committed,
                    report.batches_committed,
                    report.sources_total,
                    report.sources_failed
                );
                Ok(report)
            }
            Some(error) => {
                warn!(
                    "Pipeline aborted after {} committed row(s); {} source(s) skipped",
                    report.rows_committed, report.sources_skipped
                );
                Err(PipelineAbort {
                    error,
                    secondary: errors.collect(),
                    report,
                })
            }
        }
    }
}

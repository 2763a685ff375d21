//! Run summaries for the pipeline.

use std::time::Duration;

use thiserror::Error;

use crate::error_handling::StorageFatalError;

/// Counts from one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub sources_total: usize,
    pub sources_failed: usize,
    /// Sources never started because the run was aborting
    pub sources_skipped: usize,
    pub items_extracted: usize,
    pub items_classified: usize,
    pub classification_failures: usize,
    /// Below threshold, stored as `Uncategorized`
    pub low_confidence_kept: usize,
    /// Below threshold, skipped
    pub low_confidence_dropped: usize,
    pub records_submitted: usize,
    /// Classified items not submitted because the run was aborting
    pub items_abandoned: usize,
    pub batches_committed: u64,
    pub rows_committed: u64,
    pub elapsed: Duration,
}

impl PipelineReport {
    pub(crate) fn absorb(&mut self, outcome: &SourceOutcome) {
        if outcome.failed {
            self.sources_failed += 1;
        }
        if outcome.skipped {
            self.sources_skipped += 1;
        }
        self.items_extracted += outcome.extracted;
        self.items_classified += outcome.classified;
        self.classification_failures += outcome.classification_failures;
        self.low_confidence_kept += outcome.low_confidence_kept;
        self.low_confidence_dropped += outcome.low_confidence_dropped;
        self.records_submitted += outcome.submitted;
        self.items_abandoned += outcome.abandoned;
    }
}

/// What happened while processing one source.
#[derive(Debug, Default)]
pub(crate) struct SourceOutcome {
    pub(crate) extracted: usize,
    pub(crate) classified: usize,
    pub(crate) classification_failures: usize,
    pub(crate) low_confidence_kept: usize,
    pub(crate) low_confidence_dropped: usize,
    pub(crate) submitted: usize,
    pub(crate) abandoned: usize,
    pub(crate) failed: bool,
    pub(crate) skipped: bool,
    pub(crate) fatal: Option<StorageFatalError>,
}

/// A run stopped by a fatal storage error.
///
/// Submissions already in flight were allowed to finish and one final drain
/// was attempted before returning.
#[derive(Debug, Error)]
#[error("Pipeline aborted: {error}")]
pub struct PipelineAbort {
    #[source]
    pub error: StorageFatalError,
    /// Further fatal errors hit by in-flight submissions or the final drain
    pub secondary: Vec<StorageFatalError>,
    pub report: PipelineReport,
}

impl PipelineAbort {
    /// Every fatal error of the run, first one first.
    pub fn errors(&self) -> impl Iterator<Item = &StorageFatalError> {
        std::iter::once(&self.error).chain(self.secondary.iter())
    }

    /// Total records the run failed to persist.
    pub fn unwritten_records(&self) -> usize {
        self.errors()
            .filter_map(StorageFatalError::failed_batch)
            .map(|batch| batch.len())
            .sum()
    }

    /// Distinct sources with unwritten records, sorted.
    pub fn affected_sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = self
            .errors()
            .filter_map(StorageFatalError::failed_batch)
            .flat_map(|batch| batch.sources())
            .collect();
        sources.sort();
        sources.dedup();
        sources
    }
}

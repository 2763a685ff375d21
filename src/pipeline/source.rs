//! Processing of a single source: extract, classify, submit.

use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::classify::{Classifier, Verdict};
use crate::config::{SourceConfig, LOG_SNIPPET_CHARS, UNCATEGORIZED};
use crate::error_handling::{ErrorType, InfoType, WarningType};
use crate::extract::{Extractor, RawItem};
use crate::record::{snippet, Record};
use crate::storage::BatchConnection;

use super::report::SourceOutcome;
use super::Pipeline;

impl<E, K, C> Pipeline<E, K, C>
where
    E: Extractor,
    K: Classifier,
    C: BatchConnection,
{
    /// Runs one source to completion.
    ///
    /// Extraction failures fail the source only. Classification failures skip
    /// the item. A fatal storage error cancels `abort` and stops this source.
    pub(super) async fn process_source(
        &self,
        source: &SourceConfig,
        abort: &CancellationToken,
    ) -> SourceOutcome {
        let mut outcome = SourceOutcome::default();
        if abort.is_cancelled() {
            outcome.skipped = true;
            return outcome;
        }

        let items = match self.extractor.extract(source).await {
            Ok(items) => items,
            Err(e) => {
                error!("Failed to process {}: {e}", source.name);
                self.stats.increment_error(ErrorType::ExtractionError);
                outcome.failed = true;
                return outcome;
            }
        };
        outcome.extracted = items.len();
        if items.is_empty() {
            warn!("No items extracted from {}", source.name);
            self.stats.increment_warning(WarningType::EmptySource);
            return outcome;
        }

        let total = items.len();
        for (index, item) in items.into_iter().enumerate() {
            if abort.is_cancelled() {
                outcome.abandoned += total - index;
                break;
            }

            let Some(record) = self.classify_item(&item, &mut outcome).await else {
                continue;
            };

            match self.coordinator.submit(record).await {
                Ok(_) => outcome.submitted += 1,
                Err(fatal) => {
                    // The record went into the failed batch; count it as submitted.
                    outcome.submitted += 1;
                    error!("Fatal storage error while processing {}: {fatal}", source.name);
                    abort.cancel();
                    outcome.abandoned += total - index - 1;
                    outcome.fatal = Some(fatal);
                    break;
                }
            }
        }
        outcome
    }

    /// Classifies one item and applies the low-confidence policy.
    ///
    /// Returns the record to store, or `None` if the item is skipped.
    async fn classify_item(&self, item: &RawItem, outcome: &mut SourceOutcome) -> Option<Record> {
        let classification = match self
            .classifier
            .classify(&item.text, &self.settings.categories)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                warn!(
                    "Failed to classify [{}] '{}': {e}",
                    item.source,
                    snippet(&item.text, LOG_SNIPPET_CHARS)
                );
                self.stats.increment_error(ErrorType::ClassificationError);
                outcome.classification_failures += 1;
                return None;
            }
        };
        outcome.classified += 1;

        let category = match classification.verdict(
            self.settings.confidence_threshold,
            self.settings.low_confidence_policy,
        ) {
            Verdict::Confident => classification.category.clone(),
            Verdict::Uncategorized => {
                self.stats.increment_info(InfoType::LowConfidenceStored);
                outcome.low_confidence_kept += 1;
                UNCATEGORIZED.to_string()
            }
            Verdict::Dropped => {
                info!(
                    "Skipping '{}' - confidence too low: {:.2}",
                    snippet(&item.text, LOG_SNIPPET_CHARS),
                    classification.confidence
                );
                self.stats.increment_warning(WarningType::LowConfidenceDropped);
                outcome.low_confidence_dropped += 1;
                return None;
            }
        };

        match Record::new(
            item.source.as_str(),
            item.text.as_str(),
            category,
            classification.raw_label,
            classification.confidence,
            self.clock.now(),
        ) {
            Ok(record) => {
                info!(
                    "[{}] {} --> [{}] (conf: {:.2})",
                    record.source(),
                    record.text(),
                    record.category(),
                    record.confidence()
                );
                Some(record)
            }
            Err(e) => {
                warn!(
                    "Discarding [{}] '{}': {e}",
                    item.source,
                    snippet(&item.text, LOG_SNIPPET_CHARS)
                );
                self.stats.increment_error(ErrorType::ClassificationError);
                outcome.classification_failures += 1;
                None
            }
        }
    }
}

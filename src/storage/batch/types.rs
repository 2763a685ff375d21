//! Batch data structures.
//!
//! This module defines the batch lifecycle (`BatchState`), the result of a
//! successful flush (`FlushReport`), the records handed back when a flush
//! gives up (`FailedBatch`) and the retry policy for flush attempts.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::config::{FLUSH_MAX_RETRIES, FLUSH_RETRY_FACTOR, FLUSH_RETRY_INITIAL_DELAY_MS};
use crate::record::Record;

/// Lifecycle of one batch.
///
/// `Accumulating -> Flushing -> Committed | Failed`. A batch never leaves a
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Accumulating,
    Flushing,
    Committed,
    Failed,
}

impl BatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Committed | BatchState::Failed)
    }

    fn can_advance_to(&self, next: BatchState) -> bool {
        matches!(
            (self, next),
            (BatchState::Accumulating, BatchState::Flushing)
                | (BatchState::Flushing, BatchState::Committed)
                | (BatchState::Flushing, BatchState::Failed)
        )
    }
}

/// A batch being written by the coordinator.
pub(crate) struct Batch {
    pub(crate) id: u64,
    pub(crate) records: Vec<Record>,
    pub(crate) attempts: u32,
    state: BatchState,
}

impl Batch {
    pub(crate) fn new(id: u64, records: Vec<Record>) -> Self {
        Batch {
            id,
            records,
            attempts: 0,
            state: BatchState::Accumulating,
        }
    }

    pub(crate) fn state(&self) -> BatchState {
        self.state
    }

    /// Moves to `next` if the transition is legal. Returns whether it moved.
    pub(crate) fn advance(&mut self, next: BatchState) -> bool {
        if self.state.can_advance_to(next) {
            log::trace!("Batch {}: {:?} -> {:?}", self.id, self.state, next);
            self.state = next;
            true
        } else {
            log::error!(
                "Batch {}: illegal state transition {:?} -> {:?}",
                self.id,
                self.state,
                next
            );
            false
        }
    }

    pub(crate) fn into_failed(mut self) -> FailedBatch {
        if self.state != BatchState::Failed {
            self.advance(BatchState::Failed);
        }
        FailedBatch {
            id: self.id,
            records: self.records,
            attempts: self.attempts,
        }
    }
}

/// Records of a batch that could not be persisted.
///
/// Returned inside `StorageFatalError` so the caller can skip them or scope a
/// retry run to the affected sources.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedBatch {
    pub id: u64,
    pub records: Vec<Record>,
    /// Write attempts made before giving up (0 if no connection was obtained)
    pub attempts: u32,
}

impl FailedBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct sources of the unwritten records, sorted.
    pub fn sources(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.source().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Outcome of a committed flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub batch_id: u64,
    /// Rows the transaction inserted
    pub rows: u64,
    /// Attempts it took, including the successful one
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Bounded retry with exponential backoff for flush attempts.
///
/// `max_retries` retries means at most `max_retries + 1` attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub factor: u32,
}

impl RetryPolicy {
    /// Retries without sleeping between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        RetryPolicy {
            max_retries,
            initial_delay: Duration::ZERO,
            factor: 1,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        let multiplier = self.factor.saturating_pow(exponent);
        self.initial_delay.saturating_mul(multiplier)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: FLUSH_MAX_RETRIES,
            initial_delay: Duration::from_millis(FLUSH_RETRY_INITIAL_DELAY_MS),
            factor: FLUSH_RETRY_FACTOR,
        }
    }
}

/// Snapshot of the coordinator's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub batches_committed: u64,
    pub rows_committed: u64,
    pub batches_failed: u64,
    /// Every insert attempt, successful or not
    pub attempts: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(source: &str) -> Record {
        Record::new(source, "text", "News", "News", 0.9, Utc::now()).unwrap()
    }

    #[test]
    fn test_retry_policy_default_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
    }

    #[test]
    fn test_immediate_policy_never_sleeps() {
        let policy = RetryPolicy::immediate(5);
        assert_eq!(policy.max_attempts(), 6);
        assert_eq!(policy.delay_for(5), Duration::ZERO);
    }

    #[test]
    fn test_batch_state_transitions() {
        let mut batch = Batch::new(1, vec![record("A")]);
        assert_eq!(batch.state(), BatchState::Accumulating);
        assert!(!batch.advance(BatchState::Committed));
        assert!(batch.advance(BatchState::Flushing));
        assert!(batch.advance(BatchState::Committed));
        assert!(batch.state().is_terminal());
        assert!(!batch.advance(BatchState::Failed));
        assert_eq!(batch.state(), BatchState::Committed);
    }

    #[test]
    fn test_failed_batch_sources_are_distinct_and_sorted() {
        let mut batch = Batch::new(7, vec![record("B"), record("A"), record("B")]);
        batch.advance(BatchState::Flushing);
        batch.attempts = 4;
        let failed = batch.into_failed();
        assert_eq!(failed.id, 7);
        assert_eq!(failed.len(), 3);
        assert_eq!(failed.attempts, 4);
        assert_eq!(failed.sources(), vec!["A".to_string(), "B".to_string()]);
    }
}

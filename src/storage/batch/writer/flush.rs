//! Batch flushing logic.

use std::sync::atomic::Ordering;
use std::time::Instant;

use log::{debug, error, warn};

use crate::error_handling::{
    ErrorType, PoolError, StorageError, StorageFatalError, WarningType,
};
use crate::record::Record;
use crate::storage::batch::types::{Batch, BatchState, FailedBatch, FlushReport};
use crate::storage::connection::BatchConnection;
use crate::storage::pool::Lease;

use super::WriteCoordinator;

impl<C: BatchConnection> WriteCoordinator<C> {
    /// Writes `records` as one batch.
    ///
    /// Acquires a pooled connection, inserts every record in a single
    /// transaction and retries the whole batch per the retry policy. The
    /// lease is always released, whatever the outcome.
    pub(super) async fn flush(&self, records: Vec<Record>) -> Result<FlushReport, StorageFatalError> {
        let id = self.next_batch_id.fetch_add(1, Ordering::SeqCst);
        let mut batch = Batch::new(id, records);
        batch.advance(BatchState::Flushing);
        let started = Instant::now();
        debug!("Flushing batch {} of {} records", id, batch.records.len());

        let mut lease = match self.pool.acquire().await {
            Ok(lease) => lease,
            Err(PoolError::Exhausted { waited }) => {
                let batch = self.give_up(batch, "no pooled connection became free");
                return Err(StorageFatalError::PoolExhausted { waited, batch });
            }
            Err(PoolError::Misuse(error)) => {
                let batch = self.give_up(batch, "the connection pool refused the lease");
                return Err(StorageFatalError::Misuse {
                    error,
                    unwritten: Some(batch),
                });
            }
        };

        let outcome = self.write_with_retries(&mut lease, &mut batch).await;

        if let Err(error) = self.pool.release(lease).await {
            error!("Failed to release connection after batch {id}: {error}");
            let unwritten = match outcome {
                Ok(rows) => {
                    self.record_commit(&mut batch, rows);
                    None
                }
                Err(_) => Some(self.give_up(batch, "the connection could not be released")),
            };
            return Err(StorageFatalError::Misuse { error, unwritten });
        }

        match outcome {
            Ok(rows) => {
                self.record_commit(&mut batch, rows);
                let report = FlushReport {
                    batch_id: id,
                    rows,
                    attempts: batch.attempts,
                    elapsed: started.elapsed(),
                };
                debug!(
                    "Committed batch {} ({} rows, {} attempt(s), {:?})",
                    id, rows, report.attempts, report.elapsed
                );
                Ok(report)
            }
            Err(last_error) => {
                let batch = self.give_up(batch, "every write attempt failed");
                Err(StorageFatalError::RetriesExhausted { batch, last_error })
            }
        }
    }

    /// Runs the insert until it succeeds or attempts run out.
    ///
    /// A failed attempt leaves nothing behind (the transaction is rolled
    /// back), so replaying the same records cannot duplicate rows.
    async fn write_with_retries(
        &self,
        lease: &mut Lease<C>,
        batch: &mut Batch,
    ) -> Result<u64, StorageError> {
        let max_attempts = self.retry.max_attempts();
        loop {
            batch.attempts += 1;
            self.counters.attempts.fetch_add(1, Ordering::SeqCst);

            match lease.insert_batch(&batch.records).await {
                Ok(rows) => return Ok(rows),
                Err(e) if batch.attempts < max_attempts => {
                    let delay = self.retry.delay_for(batch.attempts);
                    warn!(
                        "Batch {} attempt {}/{} failed: {}. Retrying in {:?}",
                        batch.id, batch.attempts, max_attempts, e, delay
                    );
                    self.stats.increment_warning(WarningType::FlushRetried);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => {
                    error!(
                        "Batch {} attempt {}/{} failed: {}",
                        batch.id, batch.attempts, max_attempts, e
                    );
                    return Err(e);
                }
            }
        }
    }

    fn record_commit(&self, batch: &mut Batch, rows: u64) {
        batch.advance(BatchState::Committed);
        self.counters.batches_committed.fetch_add(1, Ordering::SeqCst);
        self.counters.rows_committed.fetch_add(rows, Ordering::SeqCst);
    }

    fn give_up(&self, batch: Batch, reason: &str) -> FailedBatch {
        self.counters.batches_failed.fetch_add(1, Ordering::SeqCst);
        self.stats.increment_error(ErrorType::FlushFailed);

        let failed = batch.into_failed();
        error!(
            "Batch {} not written ({}): {} record(s) from {}",
            failed.id,
            reason,
            failed.len(),
            failed.sources().join(", ")
        );
        for record in &failed.records {
            error!("  unwritten [{}] {}", record.source(), record.text());
        }
        failed
    }
}

//! Write coordinator.
//!
//! This module provides the `WriteCoordinator`, which buffers submitted
//! records and flushes them to storage once the batch threshold is reached.

mod flush;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error_handling::{ProcessingStats, StorageFatalError};
use crate::record::Record;
use crate::storage::connection::BatchConnection;
use crate::storage::pool::ConnectionPool;

use super::buffer::BatchBuffer;
use super::types::{FlushReport, RetryPolicy, WriteStats};

#[derive(Default)]
struct Counters {
    batches_committed: AtomicU64,
    rows_committed: AtomicU64,
    batches_failed: AtomicU64,
    attempts: AtomicU64,
}

/// Buffers records and writes them in transactional batches.
///
/// `submit` and `drain` are mutually exclusive: the buffer lock is held from
/// the add through the end of the flush, so a batch is never split or written
/// twice no matter how many producers share the coordinator.
pub struct WriteCoordinator<C: BatchConnection> {
    pool: Arc<ConnectionPool<C>>,
    buffer: Mutex<BatchBuffer>,
    batch_size: usize,
    retry: RetryPolicy,
    stats: Arc<ProcessingStats>,
    next_batch_id: AtomicU64,
    counters: Counters,
}

impl<C: BatchConnection> WriteCoordinator<C> {
    pub fn new(pool: Arc<ConnectionPool<C>>, batch_size: usize) -> Self {
        let buffer = BatchBuffer::new(batch_size);
        WriteCoordinator {
            pool,
            batch_size: buffer.threshold(),
            buffer: Mutex::new(buffer),
            retry: RetryPolicy::default(),
            stats: Arc::new(ProcessingStats::new()),
            next_batch_id: AtomicU64::new(1),
            counters: Counters::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Shares a run-wide statistics tracker for retry and failure counts.
    pub fn with_stats(mut self, stats: Arc<ProcessingStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Buffers `record`, flushing the batch when it reaches the threshold.
    ///
    /// Returns the flush report when this call triggered a committed flush.
    ///
    /// # Errors
    ///
    /// A `StorageFatalError` when the flush could not get a connection or
    /// failed on every attempt. The error carries the unwritten records and
    /// the buffer is left empty.
    pub async fn submit(&self, record: Record) -> Result<Option<FlushReport>, StorageFatalError> {
        let mut buffer = self.buffer.lock().await;
        if !buffer.add(record) {
            return Ok(None);
        }
        let records = buffer.drain();
        self.flush(records).await.map(Some)
    }

    /// Flushes whatever is buffered. Returns `None` if the buffer was empty.
    pub async fn drain(&self) -> Result<Option<FlushReport>, StorageFatalError> {
        let mut buffer = self.buffer.lock().await;
        if buffer.is_empty() {
            return Ok(None);
        }
        let records = buffer.drain();
        self.flush(records).await.map(Some)
    }

    /// Records buffered but not yet flushed.
    pub async fn pending(&self) -> usize {
        self.buffer.lock().await.len()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn pool(&self) -> &Arc<ConnectionPool<C>> {
        &self.pool
    }

    pub fn stats(&self) -> WriteStats {
        WriteStats {
            batches_committed: self.counters.batches_committed.load(Ordering::SeqCst),
            rows_committed: self.counters.rows_committed.load(Ordering::SeqCst),
            batches_failed: self.counters.batches_failed.load(Ordering::SeqCst),
            attempts: self.counters.attempts.load(Ordering::SeqCst),
        }
    }
}

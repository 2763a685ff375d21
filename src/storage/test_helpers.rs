//! Shared test helpers for storage module tests.
//!
//! `MemoryConnection` is a `BatchConnection` that commits into a shared
//! `MemoryStore`, with injectable failures so the retry and pool logic can be
//! tested without SQLite.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error_handling::StorageError;
use crate::record::Record;
use crate::storage::connection::BatchConnection;

/// Committed batches plus counters, shared by every `MemoryConnection`.
#[derive(Default)]
pub struct MemoryStore {
    batches: Mutex<Vec<Vec<Record>>>,
    attempts: AtomicUsize,
    failures_left: AtomicUsize,
    closed: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes the next `n` insert attempts fail (`usize::MAX` fails forever).
    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    /// Every committed row, in commit order.
    pub fn rows(&self) -> Vec<Record> {
        self.batches.lock().unwrap().iter().flatten().cloned().collect()
    }

    pub fn committed_batches(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Vec::len).collect()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn closed_connections(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct MemoryConnection {
    store: Arc<MemoryStore>,
}

impl MemoryConnection {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        MemoryConnection { store }
    }
}

#[async_trait]
impl BatchConnection for MemoryConnection {
    async fn insert_batch(&mut self, records: &[Record]) -> Result<u64, StorageError> {
        self.store.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .store
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            })
            .is_ok();
        if failing {
            return Err(StorageError::SqlError(sqlx::Error::Protocol(
                "injected write failure".into(),
            )));
        }
        tokio::task::yield_now().await;
        self.store.batches.lock().unwrap().push(records.to_vec());
        Ok(records.len() as u64)
    }

    async fn close(self) -> Result<(), StorageError> {
        self.store.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

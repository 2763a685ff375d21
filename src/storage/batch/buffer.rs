//! In-memory batch accumulation.

use crate::record::Record;

/// Ordered list of pending records plus the size that triggers a flush.
///
/// Not synchronised: `WriteCoordinator` keeps it behind its own lock.
#[derive(Debug)]
pub struct BatchBuffer {
    records: Vec<Record>,
    threshold: usize,
}

impl BatchBuffer {
    /// A threshold of 0 is treated as 1.
    pub fn new(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        BatchBuffer {
            records: Vec::with_capacity(threshold),
            threshold,
        }
    }

    /// Appends a record. Returns `true` once the buffer has reached the threshold.
    pub fn add(&mut self, record: Record) -> bool {
        self.records.push(record);
        self.records.len() >= self.threshold
    }

    /// Takes every buffered record, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<Record> {
        std::mem::replace(&mut self.records, Vec::with_capacity(self.threshold))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

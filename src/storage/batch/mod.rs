//! Batched writes.
//!
//! Records are buffered in a `BatchBuffer` and written by the
//! `WriteCoordinator` one transaction per batch, using a connection leased
//! from the `ConnectionPool`.

mod buffer;
mod types;
mod writer;

pub use buffer::BatchBuffer;
pub use types::{BatchState, FailedBatch, FlushReport, RetryPolicy, WriteStats};
pub use writer::WriteCoordinator;

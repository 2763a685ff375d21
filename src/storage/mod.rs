// storage/mod.rs
// Database operations module

pub mod batch;
pub mod connection;
pub mod migrations;
pub mod pool;
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used items
pub use batch::{
    BatchBuffer, BatchState, FailedBatch, FlushReport, RetryPolicy, WriteCoordinator, WriteStats,
};
pub use connection::{open_connections, BatchConnection, DatabaseStats, SqliteBatchConnection};
pub use migrations::run_migrations;
pub use pool::{ConnectionPool, Lease};

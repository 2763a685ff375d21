//! Run resources.
//!
//! Everything a run owns: the connection pool, the write coordinator on top of
//! it and the statistics tracker. Built once per run and torn down in
//! `finalize_run`; nothing here is global.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use log::info;

use crate::config::{Config, POOL_ACQUIRE_TIMEOUT};
use crate::error_handling::ProcessingStats;
use crate::storage::{open_connections, ConnectionPool, SqliteBatchConnection, WriteCoordinator};

/// All resources initialized for an ingest run.
pub struct IngestResources {
    pub pool: Arc<ConnectionPool<SqliteBatchConnection>>,
    pub coordinator: Arc<WriteCoordinator<SqliteBatchConnection>>,
    pub error_stats: Arc<ProcessingStats>,
    pub start_time: Instant,
    pub config: Config,
}

/// Opens the database, applies the schema and builds the pool and coordinator.
///
/// With `clear_existing` set, every stored headline is deleted first.
pub async fn init_resources(config: Config) -> Result<IngestResources> {
    let start_time = Instant::now();

    let mut connections = open_connections(&config.db_path, config.pool_size)
        .await
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;

    if config.clear_existing {
        if let Some(first) = connections.first_mut() {
            first
                .clear_headlines()
                .await
                .context("Failed to clear existing headlines")?;
        }
    }

    info!(
        "Database {} ready: pool of {} connection(s), batches of {}",
        config.db_path.display(),
        connections.len(),
        config.batch_size
    );

    let error_stats = Arc::new(ProcessingStats::new());
    let pool = Arc::new(ConnectionPool::new(connections, POOL_ACQUIRE_TIMEOUT));
    let coordinator = Arc::new(
        WriteCoordinator::new(Arc::clone(&pool), config.batch_size)
            .with_stats(Arc::clone(&error_stats)),
    );

    Ok(IngestResources {
        pool,
        coordinator,
        error_stats,
        start_time,
        config,
    })
}

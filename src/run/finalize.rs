//! Run finalization and cleanup.

use std::path::Path;

use anyhow::Result;

use crate::app::{print_database_statistics, print_error_statistics, print_run_summary};
use crate::pipeline::{PipelineAbort, PipelineReport};
use crate::storage::{BatchConnection, DatabaseStats, SqliteBatchConnection};

use super::{IngestResources, RunReport};

/// Tears the run down and produces its report.
///
/// Steps, in order:
/// 1. Note how many records are still buffered (non-zero only after an abort)
/// 2. Close the pool, waiting for any in-flight flush
/// 3. Read the database statistics on a fresh connection and checkpoint the WAL
/// 4. Print statistics
///
/// Step 3 is best-effort: a failure there is logged and leaves
/// `RunReport::database` empty. An aborted pipeline is always returned as the
/// error, whatever happened during cleanup.
pub async fn finalize_run(
    resources: IngestResources,
    outcome: Result<PipelineReport, PipelineAbort>,
) -> Result<RunReport> {
    let IngestResources {
        pool,
        coordinator,
        error_stats,
        start_time,
        config,
    } = resources;

    let pending_batch_size = coordinator.pending().await;
    pool.close().await;
    log::debug!("Connection pool closed");

    let database = read_database_stats(&config.db_path).await;

    print_error_statistics(&error_stats);
    if let Some(database) = &database {
        print_database_statistics(database, pending_batch_size);
    }

    let pipeline = match outcome {
        Ok(report) => report,
        Err(abort) => {
            print_run_summary(&abort.report);
            return Err(abort.into());
        }
    };
    print_run_summary(&pipeline);

    Ok(RunReport {
        pipeline,
        database,
        pending_batch_size,
        db_path: config.db_path,
        elapsed_seconds: start_time.elapsed().as_secs_f64(),
    })
}

/// Reads row counts and checkpoints the WAL. Returns `None` if the database
/// can't be reopened or queried.
async fn read_database_stats(db_path: &Path) -> Option<DatabaseStats> {
    let mut conn = match SqliteBatchConnection::open(db_path).await {
        Ok(conn) => conn,
        Err(e) => {
            log::warn!("Failed to reopen database for statistics: {e}");
            return None;
        }
    };

    let stats = match conn.database_stats().await {
        Ok(stats) => Some(stats),
        Err(e) => {
            log::warn!("Failed to read database statistics: {e}");
            None
        }
    };
    if let Err(e) = conn.checkpoint().await {
        log::warn!("Failed to checkpoint WAL file (this is non-critical): {e}");
    }
    if let Err(e) = conn.close().await {
        log::warn!("Failed to close statistics connection: {e}");
    }
    stats
}

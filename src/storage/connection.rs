//! Storage connections.
//!
//! `BatchConnection` is the seam between the write coordinator and the
//! database: one connection, one transactional multi-row insert per call.
//! `SqliteBatchConnection` is the production implementation:
//! - WAL mode enabled for concurrent access
//! - Busy timeout so pooled connections wait on each other instead of failing
//! - Automatic database file creation

use std::path::Path;

use async_trait::async_trait;
use log::{error, info};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::{ConnectOptions, Connection, QueryBuilder, Sqlite, SqliteConnection};

use crate::config::{MAX_ROWS_PER_STATEMENT, SQLITE_BUSY_TIMEOUT};
use crate::error_handling::StorageError;
use crate::record::Record;
use crate::storage::migrations::run_migrations;

/// A storage connection that can persist a batch atomically.
#[async_trait]
pub trait BatchConnection: Send + Sized + 'static {
    /// Inserts every record in one transaction and returns the number of rows
    /// written. On error nothing from this call is visible to readers.
    async fn insert_batch(&mut self, records: &[Record]) -> Result<u64, StorageError>;

    /// Closes the underlying connection.
    async fn close(self) -> Result<(), StorageError>;
}

/// Row counts reported after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStats {
    pub total_records: i64,
    pub total_sources: i64,
}

/// One SQLite connection to the headlines database.
pub struct SqliteBatchConnection {
    conn: SqliteConnection,
}

impl SqliteBatchConnection {
    /// Opens a connection, creating the database file if it doesn't exist.
    pub async fn open(db_path: &Path) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(SQLITE_BUSY_TIMEOUT);

        let conn = options.connect().await.map_err(|e| {
            error!("Failed to connect to database {}: {e}", db_path.display());
            StorageError::SqlError(e)
        })?;

        Ok(SqliteBatchConnection { conn })
    }

    /// Creates the `headlines` table and its indexes if missing.
    pub async fn apply_schema(&mut self) -> Result<(), StorageError> {
        run_migrations(&mut self.conn).await
    }

    /// Counts stored rows and distinct sources.
    pub async fn database_stats(&mut self) -> Result<DatabaseStats, StorageError> {
        let total_records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM headlines")
            .fetch_one(&mut self.conn)
            .await?;
        let total_sources: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT source) FROM headlines")
            .fetch_one(&mut self.conn)
            .await?;
        Ok(DatabaseStats {
            total_records,
            total_sources,
        })
    }

    /// Folds the WAL file back into the database file.
    pub async fn checkpoint(&mut self) -> Result<(), StorageError> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&mut self.conn)
            .await?;
        Ok(())
    }

    /// Deletes every stored headline. Returns the number of rows removed.
    pub async fn clear_headlines(&mut self) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM headlines")
            .execute(&mut self.conn)
            .await?;
        info!("All data cleared from database ({} rows).", result.rows_affected());
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl BatchConnection for SqliteBatchConnection {
    async fn insert_batch(&mut self, records: &[Record]) -> Result<u64, StorageError> {
        if records.is_empty() {
            return Ok(0);
        }

        // Dropping `tx` on any error path rolls the whole batch back.
        let mut tx = self.conn.begin().await?;
        let mut inserted = 0;

        for chunk in records.chunks(MAX_ROWS_PER_STATEMENT) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO headlines (source, headline, category, raw_label, confidence, scraped_at) ",
            );
            builder.push_values(chunk, |mut row, record| {
                row.push_bind(record.source())
                    .push_bind(record.text())
                    .push_bind(record.category())
                    .push_bind(record.raw_label())
                    .push_bind(record.confidence())
                    .push_bind(record.scraped_at());
            });
            let result = builder.build().execute(&mut *tx).await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn close(self) -> Result<(), StorageError> {
        self.conn.close().await?;
        Ok(())
    }
}

/// Opens `count` connections to `db_path` and applies the schema once.
pub async fn open_connections(
    db_path: &Path,
    count: usize,
) -> Result<Vec<SqliteBatchConnection>, StorageError> {
    let mut connections = Vec::with_capacity(count);
    for _ in 0..count {
        connections.push(SqliteBatchConnection::open(db_path).await?);
    }
    if let Some(first) = connections.first_mut() {
        first.apply_schema().await?;
    }
    log::debug!(
        "Opened {} connection(s) to {}",
        connections.len(),
        db_path.display()
    );
    Ok(connections)
}

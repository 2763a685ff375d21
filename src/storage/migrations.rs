// storage/migrations.rs
// Idempotent schema setup for the headlines database

use sqlx::SqliteConnection;

use crate::error_handling::StorageError;

/// Statements applied in order on startup. Each one is a no-op when its
/// object already exists.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS headlines (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source TEXT NOT NULL,
        headline TEXT NOT NULL,
        category TEXT NOT NULL,
        raw_label TEXT,
        confidence REAL,
        scraped_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE INDEX IF NOT EXISTS idx_headlines_source ON headlines (source)",
    "CREATE INDEX IF NOT EXISTS idx_headlines_category ON headlines (category)",
];

/// Creates the `headlines` table and its indexes if they don't exist.
pub async fn run_migrations(conn: &mut SqliteConnection) -> Result<(), StorageError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(&mut *conn).await?;
    }
    Ok(())
}

// Shared test helpers: fakes for the pipeline's capabilities and SQLite
// fixtures with injectable write failures.

#![allow(dead_code)] // Each test file uses a different subset

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, SqliteConnection};
use tempfile::TempDir;

use headline_ingest::storage::open_connections;
use headline_ingest::{
    BatchConnection, Classification, ClassificationError, Classifier,
    ExtractionError, Extractor, RawItem, Record, SourceConfig, SqliteBatchConnection,
    StorageError,
};

/// A fresh database path inside a temporary directory.
/// Keep the `TempDir` alive for as long as the database is used.
pub fn temp_db() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("headlines.db");
    (dir, path)
}

pub fn record(source: &str, text: &str) -> Record {
    Record::new(source, text, "News", "News", 0.8, Utc::now()).expect("valid record")
}

pub fn source(name: &str, url: &str) -> SourceConfig {
    SourceConfig {
        name: name.to_string(),
        url: url.to_string(),
        selector: None,
    }
}

/// Opens a plain connection for assertions and fixture setup.
pub async fn raw_connection(db_path: &Path) -> SqliteConnection {
    SqliteConnectOptions::new()
        .filename(db_path)
        .busy_timeout(std::time::Duration::from_secs(5))
        .connect()
        .await
        .expect("Failed to open database")
}

pub async fn count_rows(db_path: &Path) -> i64 {
    let mut conn = raw_connection(db_path).await;
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM headlines")
        .fetch_one(&mut conn)
        .await
        .expect("Failed to count rows");
    conn.close().await.ok();
    count
}

/// `(source, headline, category)` for every stored row, in insertion order.
pub async fn stored_rows(db_path: &Path) -> Vec<(String, String, String)> {
    let mut conn = raw_connection(db_path).await;
    let rows = sqlx::query_as("SELECT source, headline, category FROM headlines ORDER BY id")
        .fetch_all(&mut conn)
        .await
        .expect("Failed to read rows");
    conn.close().await.ok();
    rows
}

/// Creates the schema, then a trigger that rejects any row whose headline is
/// `poison` while `fault.armed = 1`.
pub async fn install_poison_trigger(db_path: &Path, armed: bool) {
    let conns = open_connections(db_path, 1).await.expect("Failed to create schema");
    for conn in conns {
        conn.close().await.expect("close");
    }

    let mut conn = raw_connection(db_path).await;
    for statement in [
        "CREATE TABLE IF NOT EXISTS fault (armed INTEGER NOT NULL)",
        "DELETE FROM fault",
        "CREATE TRIGGER IF NOT EXISTS reject_poison BEFORE INSERT ON headlines
         WHEN NEW.headline = 'poison' AND (SELECT armed FROM fault) = 1
         BEGIN SELECT RAISE(ABORT, 'injected failure'); END",
    ] {
        sqlx::query(statement)
            .execute(&mut conn)
            .await
            .expect("Failed to install trigger");
    }
    sqlx::query("INSERT INTO fault (armed) VALUES (?)")
        .bind(armed as i64)
        .execute(&mut conn)
        .await
        .expect("Failed to arm trigger");
    conn.close().await.ok();
}

/// A SQLite connection whose first `failures` insert attempts hit the poison
/// trigger. Rows written before the failing statement are part of the same
/// transaction, so each failed attempt exercises the rollback.
pub struct FlakyConnection {
    inner: SqliteBatchConnection,
    control: SqliteConnection,
    failures_left: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
}

impl FlakyConnection {
    pub async fn open(db_path: &Path, failures: Arc<AtomicUsize>, attempts: Arc<AtomicUsize>) -> Self {
        FlakyConnection {
            inner: SqliteBatchConnection::open(db_path).await.expect("open"),
            control: raw_connection(db_path).await,
            failures_left: failures,
            attempts,
        }
    }
}

#[async_trait]
impl BatchConnection for FlakyConnection {
    async fn insert_batch(&mut self, records: &[Record]) -> Result<u64, StorageError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        sqlx::query("UPDATE fault SET armed = ?")
            .bind(fail as i64)
            .execute(&mut self.control)
            .await?;
        self.inner.insert_batch(records).await
    }

    async fn close(self) -> Result<(), StorageError> {
        self.control.close().await?;
        self.inner.close().await
    }
}

/// Serves fixed items per source URL. URLs without an entry fail extraction.
pub struct FakeExtractor {
    pages: HashMap<String, Vec<String>>,
}

impl FakeExtractor {
    pub fn new(pages: Vec<(&str, Vec<&str>)>) -> Self {
        FakeExtractor {
            pages: pages
                .into_iter()
                .map(|(url, items)| (url.to_string(), items.into_iter().map(String::from).collect()))
                .collect(),
        }
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn extract(&self, source: &SourceConfig) -> Result<Vec<RawItem>, ExtractionError> {
        match self.pages.get(&source.url) {
            Some(items) => Ok(items
                .iter()
                .map(|text| RawItem::new(source.name.clone(), text.clone()))
                .collect()),
            None => Err(ExtractionError::Status {
                url: source.url.clone(),
                status: 503,
            }),
        }
    }
}

/// Picks the first candidate label. Texts starting with `low:` score 0.1,
/// everything else 0.9.
pub struct FakeClassifier;

#[async_trait]
impl Classifier for FakeClassifier {
    async fn classify(
        &self,
        text: &str,
        labels: &[String],
    ) -> Result<Classification, ClassificationError> {
        let label = labels.first().ok_or(ClassificationError::NoLabels)?.clone();
        let confidence = if text.starts_with("low:") { 0.1 } else { 0.9 };
        Ok(Classification {
            category: label.clone(),
            raw_label: label,
            confidence,
        })
    }
}

//! `SQLite` query log.

use super::{QueryLogBackend, acquire_lock, configure_connection};
use crate::config::StorageConfig;
use crate::models::{NewQueryLogEntry, QueryLogEntry};
use crate::{Error, Result};
use chrono::Local;
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Default number of entries returned by [`SqliteQueryLog::recent`] callers.
pub const DEFAULT_RECENT_LIMIT: usize = 100;

const CREATE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS query_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    time TEXT NOT NULL,
    query TEXT NOT NULL,
    query_type TEXT,
    num_results INTEGER,
    success INTEGER DEFAULT 1,
    timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_query_logs_timestamp ON query_logs (timestamp);
";

/// Append-only query log backed by a `SQLite` file.
///
/// Records are inserted and read, never updated or deleted.
pub struct SqliteQueryLog {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteQueryLog {
    /// Opens (creating if needed) the query log at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the parent directory cannot be created or the
    /// database cannot be opened and initialized.
    pub fn open(path: impl Into<PathBuf>, config: &StorageConfig) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::io("create_query_log_dir", format!("{}: {e}", parent.display()))
            })?;
        }

        let conn = Connection::open(&path)
            .map_err(|e| Error::io("open_query_log", format!("{}: {e}", path.display())))?;
        configure_connection(&conn, config)?;
        conn.execute_batch(CREATE_TABLE)
            .map_err(|e| Error::io("create_query_log_table", e))?;

        tracing::debug!(path = %path.display(), "Opened query log");
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl QueryLogBackend for SqliteQueryLog {
    fn record(&self, entry: &NewQueryLogEntry) -> Result<i64> {
        let now = Local::now();
        let date = now.format("%Y-%m-%d").to_string();
        let time = now.format("%H:%M:%S").to_string();
        let num_results = i64::try_from(entry.num_results).unwrap_or(i64::MAX);

        let conn = acquire_lock(&self.conn);
        let result = conn
            .execute(
                "INSERT INTO query_logs (date, time, query, query_type, num_results, success)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    date,
                    time,
                    entry.query,
                    entry.query_type.as_str(),
                    num_results,
                    i64::from(entry.success)
                ],
            )
            .map(|_| conn.last_insert_rowid())
            .map_err(|e| Error::io("record_query", e));

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::counter!("cadence_query_log_writes_total", "status" => status).increment(1);
        result
    }

    fn recent(&self, limit: usize) -> Result<Vec<QueryLogEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare(
                "SELECT id, date, time, query, query_type, num_results, success, timestamp
                 FROM query_logs
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?1",
            )
            .map_err(|e| Error::io("prepare_recent_queries", e))?;

        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(QueryLogEntry {
                    id: row.get(0)?,
                    date: row.get(1)?,
                    time: row.get(2)?,
                    query: row.get(3)?,
                    query_type: row.get(4)?,
                    num_results: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
                    success: row.get::<_, Option<i64>>(6)?.unwrap_or(1) != 0,
                    timestamp: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
                })
            })
            .map_err(|e| Error::io("query_recent_queries", e))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::io("read_recent_queries", e))
    }

    fn count(&self) -> Result<u64> {
        let conn = acquire_lock(&self.conn);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM query_logs", [], |row| row.get(0))
            .map_err(|e| Error::io("count_queries", e))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

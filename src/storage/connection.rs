//! Shared connection handling for `SQLite` stores.
//!
//! Provides poison-tolerant mutex acquisition and the pragma setup that lets
//! the backup API copy the database while it is being written.

use crate::config::StorageConfig;
use crate::{Error, Result};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// How long a statement waits on a locked database before failing.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Acquires a mutex, recovering the guard if a previous holder panicked.
///
/// Used for the query log connection and for the backup cycle lock; both
/// guard state that stays valid after a panic in an unrelated caller.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Mutex was poisoned, recovering");
            metrics::counter!("sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Applies journal, synchronous and busy-timeout settings.
///
/// # Concurrency Model
///
/// - **WAL mode**: readers, including an in-progress backup, do not block the
///   single writer and see a consistent snapshot
/// - **`busy_timeout`**: waits up to [`BUSY_TIMEOUT`] for locks instead of
///   failing with `SQLITE_BUSY`
///
/// # Errors
///
/// Returns [`Error::Io`] if a pragma cannot be applied.
pub fn configure_connection(conn: &Connection, config: &StorageConfig) -> Result<()> {
    if config.wal {
        // journal_mode returns the resulting mode as a row, so it is queried
        // rather than executed. In-memory databases report "memory".
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(|e| Error::io("configure_journal_mode", e))?;
        if !mode.eq_ignore_ascii_case("wal") {
            tracing::debug!(mode = %mode, "Database does not support WAL mode");
        }
    }
    conn.pragma_update(None, "synchronous", config.synchronous.as_str())
        .map_err(|e| Error::io("configure_synchronous", e))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|e| Error::io("configure_busy_timeout", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Synchronous;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_acquire_lock_concurrent() {
        let mutex = Arc::new(Mutex::new(0));
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let mutex = Arc::clone(&mutex);
                thread::spawn(move || {
                    *acquire_lock(&mutex) += 1;
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*acquire_lock(&mutex), 10);
    }

    #[test]
    fn test_acquire_lock_recovers_from_poison() {
        let mutex = Arc::new(Mutex::new(1));
        let poisoner = Arc::clone(&mutex);
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the mutex");
        })
        .join();

        assert!(mutex.is_poisoned());
        assert_eq!(*acquire_lock(&mutex), 1);
    }

    #[test]
    fn test_configure_connection_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open(dir.path().join("test.db")).unwrap();
        configure_connection(&conn, &StorageConfig::default()).unwrap();

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert_eq!(journal_mode.to_lowercase(), "wal");

        // NORMAL = 1
        let synchronous: i32 = conn
            .pragma_query_value(None, "synchronous", |row| row.get(0))
            .unwrap();
        assert_eq!(synchronous, 1);

        let busy_timeout: i32 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(busy_timeout, 5000);
    }

    #[test]
    fn test_configure_connection_without_wal() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open(dir.path().join("test.db")).unwrap();
        let config = StorageConfig {
            wal: false,
            synchronous: Synchronous::Full,
            ..StorageConfig::default()
        };
        configure_connection(&conn, &config).unwrap();

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert_eq!(journal_mode.to_lowercase(), "delete");

        // FULL = 2
        let synchronous: i32 = conn
            .pragma_query_value(None, "synchronous", |row| row.get(0))
            .unwrap();
        assert_eq!(synchronous, 2);
    }
}

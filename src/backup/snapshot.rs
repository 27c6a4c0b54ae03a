//! Consistent snapshots of the query log.

use crate::config::CadenceConfig;
use crate::models::{Snapshot, SnapshotId};
use crate::{Error, Result};
use chrono::Utc;
use rusqlite::backup::Backup;
use rusqlite::{Connection, OpenFlags};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

/// Pages per backup step. Large enough that any database is copied in a
/// single step, so the result reflects one instant. Must be positive.
const PAGES_PER_STEP: i32 = i32::MAX;

/// Pause between retries when the source is busy or locked.
const BUSY_PAUSE: Duration = Duration::from_millis(10);

/// Suffix of in-progress snapshot files; these never parse as snapshots.
const PARTIAL_SUFFIX: &str = "partial";

/// Source of snapshots for the backup scheduler.
pub trait Snapshotter: Send + Sync {
    /// Creates a new snapshot of the live store.
    ///
    /// On failure no partial snapshot is left visible.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the destination cannot be created or the source
    /// cannot be read.
    fn snapshot(&self) -> Result<Snapshot>;

    /// Lists existing snapshots, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the snapshot location cannot be read.
    fn list(&self) -> Result<Vec<Snapshot>>;

    /// Deletes one snapshot. Deleting a snapshot that is already gone succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the snapshot cannot be deleted.
    fn remove(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Snapshots a `SQLite` database file into a directory of timestamped copies.
#[derive(Debug, Clone)]
pub struct SqliteSnapshotter {
    source: PathBuf,
    backup_dir: PathBuf,
    prefix: String,
}

impl SqliteSnapshotter {
    /// Creates a snapshotter copying `source` into `backup_dir`.
    #[must_use]
    pub fn new(
        source: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            backup_dir: backup_dir.into(),
            prefix: prefix.into(),
        }
    }

    /// Creates a snapshotter for the configured query log and backup directory.
    #[must_use]
    pub fn from_config(config: &CadenceConfig) -> Self {
        Self::new(
            config.query_log_path(),
            config.backup_dir(),
            config.backup.prefix.clone(),
        )
    }

    /// Directory holding the snapshots.
    #[must_use]
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Database being copied.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Picks the first free id for `now`, appending a sequence on collisions.
    fn next_id(&self) -> SnapshotId {
        let now = Utc::now().naive_utc();
        let mut id = SnapshotId::new(now, 0);
        while self.final_path(&id).exists() || partial_path(&self.final_path(&id)).exists() {
            id.sequence = id.sequence.saturating_add(1);
        }
        id
    }

    fn final_path(&self, id: &SnapshotId) -> PathBuf {
        self.backup_dir.join(id.file_name(&self.prefix))
    }

    fn open_source(&self) -> Result<Connection> {
        // READ_WRITE without CREATE: fails if the file is missing, and can
        // attach to an existing WAL without creating a new database.
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&self.source, flags).map_err(|e| {
            Error::io(
                "open_backup_source",
                format!("{}: {e}", self.source.display()),
            )
        })?;
        conn.busy_timeout(crate::storage::BUSY_TIMEOUT)
            .map_err(|e| Error::io("open_backup_source", e))?;
        Ok(conn)
    }
}

/// Copies `source` into a new database at `dest_path`.
fn copy_database(source: &Connection, dest_path: &Path) -> Result<()> {
    let mut dest = Connection::open(dest_path).map_err(|e| {
        Error::io(
            "open_backup_destination",
            format!("{}: {e}", dest_path.display()),
        )
    })?;

    {
        let backup = Backup::new(source, &mut dest).map_err(|e| Error::io("start_backup", e))?;
        backup
            .run_to_completion(PAGES_PER_STEP, BUSY_PAUSE, None)
            .map_err(|e| Error::io("run_backup", e))?;
    }

    dest.close()
        .map_err(|(_, e)| Error::io("close_backup_destination", e))
}

fn partial_path(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_os_string();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

impl Snapshotter for SqliteSnapshotter {
    #[instrument(skip(self), fields(source = %self.source.display()))]
    fn snapshot(&self) -> Result<Snapshot> {
        fs::create_dir_all(&self.backup_dir).map_err(|e| {
            Error::io(
                "create_backup_dir",
                format!("{}: {e}", self.backup_dir.display()),
            )
        })?;

        if !self.source.is_file() {
            return Err(Error::io(
                "open_backup_source",
                format!("{} does not exist", self.source.display()),
            ));
        }
        let source = self.open_source()?;

        let id = self.next_id();
        let path = self.final_path(&id);
        let partial = partial_path(&path);

        if let Err(e) = copy_database(&source, &partial) {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
        if let Err(e) = fs::rename(&partial, &path) {
            let _ = fs::remove_file(&partial);
            return Err(Error::io(
                "publish_snapshot",
                format!("{}: {e}", path.display()),
            ));
        }

        debug!(snapshot = %path.display(), "Snapshot written");
        Ok(Snapshot { id, path })
    }

    fn list(&self) -> Result<Vec<Snapshot>> {
        let entries = match fs::read_dir(&self.backup_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::io(
                    "list_snapshots",
                    format!("{}: {e}", self.backup_dir.display()),
                ));
            },
        };

        let mut snapshots: Vec<Snapshot> = entries
            .flatten()
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .filter_map(|entry| {
                let name = entry.file_name();
                let id = SnapshotId::parse(name.to_str()?, &self.prefix)?;
                Some(Snapshot {
                    id,
                    path: entry.path(),
                })
            })
            .collect();
        snapshots.sort();
        Ok(snapshots)
    }

    fn remove(&self, snapshot: &Snapshot) -> Result<()> {
        match fs::remove_file(&snapshot.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(
                "remove_snapshot",
                format!("{}: {e}", snapshot.path.display()),
            )),
        }
    }
}

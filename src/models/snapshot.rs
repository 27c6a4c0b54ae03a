//! Backup snapshot identity.
//!
//! A snapshot is named `<prefix>_<YYYYmmdd_HHMMSS>.db`. When a name is already
//! taken within the same second, a sequence suffix is appended
//! (`<prefix>_<YYYYmmdd_HHMMSS>_<n>.db`). Ordering always uses the parsed
//! `(taken_at, sequence)` pair, never the raw file name, so `_10` sorts after `_9`.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Timestamp format used in snapshot names.
const NAME_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Snapshot file extension.
const EXTENSION: &str = ".db";

/// Identity of a snapshot, totally ordered by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotId {
    /// Creation time (UTC) at second granularity.
    pub taken_at: NaiveDateTime,
    /// Disambiguator for snapshots taken within the same second.
    pub sequence: u32,
}

impl SnapshotId {
    /// Creates a snapshot id, truncating `taken_at` to whole seconds.
    #[must_use]
    pub fn new(taken_at: NaiveDateTime, sequence: u32) -> Self {
        let taken_at = taken_at.with_nanosecond(0).unwrap_or(taken_at);
        Self { taken_at, sequence }
    }

    /// Returns the file name for this id.
    #[must_use]
    pub fn file_name(&self, prefix: &str) -> String {
        let stamp = self.taken_at.format(NAME_TIME_FORMAT);
        if self.sequence == 0 {
            format!("{prefix}_{stamp}{EXTENSION}")
        } else {
            format!("{prefix}_{stamp}_{}{EXTENSION}", self.sequence)
        }
    }

    /// Parses a file name produced by [`SnapshotId::file_name`].
    ///
    /// Returns `None` for files that do not follow the naming scheme.
    #[must_use]
    pub fn parse(file_name: &str, prefix: &str) -> Option<Self> {
        let rest = file_name
            .strip_prefix(prefix)?
            .strip_prefix('_')?
            .strip_suffix(EXTENSION)?;

        // "YYYYmmdd_HHMMSS" is 15 bytes; anything after it must be "_<n>".
        let stamp = rest.get(..15)?;
        let taken_at = NaiveDateTime::parse_from_str(stamp, NAME_TIME_FORMAT).ok()?;
        let sequence = match rest.get(15..)? {
            "" => 0,
            suffix => {
                let digits = suffix.strip_prefix('_')?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                digits.parse().ok()?
            },
        };

        Some(Self { taken_at, sequence })
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.taken_at.format(NAME_TIME_FORMAT))?;
        if self.sequence > 0 {
            write!(f, "_{}", self.sequence)?;
        }
        Ok(())
    }
}

/// An immutable, point-in-time copy of the query log.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Snapshot {
    /// Identity (ordering key).
    pub id: SnapshotId,
    /// Location of the snapshot file.
    pub path: PathBuf,
}

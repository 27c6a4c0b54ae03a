//! Count-based snapshot retention.
//!
//! Keeps the `keep` most recent snapshots and deletes everything older.
//! Recency is decided by [`crate::models::SnapshotId`] ordering, never by
//! file modification time.

use super::snapshot::Snapshotter;
use crate::models::{Snapshot, SnapshotId};
use crate::{Error, Result};
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Default number of snapshots to keep.
pub const DEFAULT_KEEP_COUNT: usize = 10;

#[inline]
fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[inline]
fn u64_to_f64(value: u64) -> f64 {
    let capped = u32::try_from(value).unwrap_or(u32::MAX);
    f64::from(capped)
}

/// How many snapshots survive a trim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    keep: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_KEEP_COUNT)
    }
}

/// Outcome of a trim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrimResult {
    /// Snapshots present before trimming.
    pub examined: usize,
    /// Snapshots that were (or would be) removed, oldest first.
    pub removed: Vec<SnapshotId>,
    /// Snapshots left in place.
    pub kept: usize,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Duration of the trim in milliseconds.
    pub duration_ms: u64,
}

impl TrimResult {
    /// Returns a human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let action = if self.dry_run { "would remove" } else { "removed" };
        if self.removed.is_empty() {
            format!(
                "No snapshots to remove ({} kept, checked in {}ms)",
                self.kept, self.duration_ms
            )
        } else {
            format!(
                "{action} {} snapshot(s), kept {} of {}",
                self.removed.len(),
                self.kept,
                self.examined
            )
        }
    }
}

impl RetentionPolicy {
    /// Creates a policy keeping the `keep` newest snapshots.
    #[must_use]
    pub const fn new(keep: usize) -> Self {
        Self { keep }
    }

    /// Number of snapshots kept.
    #[must_use]
    pub const fn keep(&self) -> usize {
        self.keep
    }

    /// Splits `snapshots` into the ones to delete, oldest first.
    ///
    /// Input order does not matter.
    #[must_use]
    pub fn select_expired(&self, mut snapshots: Vec<Snapshot>) -> Vec<Snapshot> {
        snapshots.sort();
        let excess = snapshots.len().saturating_sub(self.keep);
        snapshots.truncate(excess);
        snapshots
    }

    /// Deletes snapshots beyond the newest `keep`.
    ///
    /// Every expired snapshot is attempted even if an earlier removal fails;
    /// the first failure is returned afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if listing fails or any removal fails.
    #[instrument(
        name = "cadence.backup.trim",
        skip(self, snapshotter),
        fields(keep = self.keep, dry_run = dry_run)
    )]
    pub fn apply(&self, snapshotter: &dyn Snapshotter, dry_run: bool) -> Result<TrimResult> {
        let start = Instant::now();
        let snapshots = snapshotter.list()?;
        let examined = snapshots.len();
        let expired = self.select_expired(snapshots);

        let mut removed = Vec::with_capacity(expired.len());
        let mut first_error: Option<Error> = None;
        for snapshot in &expired {
            if dry_run {
                removed.push(snapshot.id);
                continue;
            }
            match snapshotter.remove(snapshot) {
                Ok(()) => removed.push(snapshot.id),
                Err(e) => {
                    warn!(snapshot = %snapshot.path.display(), error = %e, "Failed to remove snapshot");
                    first_error.get_or_insert(e);
                },
            }
        }

        let result = TrimResult {
            examined,
            kept: examined - removed.len(),
            removed,
            dry_run,
            duration_ms: duration_to_millis(start.elapsed()),
        };

        if !dry_run {
            metrics::counter!("cadence_snapshots_removed_total")
                .increment(u64::try_from(result.removed.len()).unwrap_or(u64::MAX));
        }
        metrics::histogram!("cadence_backup_trim_duration_ms").record(u64_to_f64(result.duration_ms));

        info!(
            examined = result.examined,
            removed = result.removed.len(),
            kept = result.kept,
            dry_run,
            "Snapshot retention applied"
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(result),
        }
    }
}

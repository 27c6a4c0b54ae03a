//! Query log backups.
//!
//! This module keeps point-in-time copies of the query log:
//!
//! - [`SqliteSnapshotter`] copies the live database through the `SQLite`
//!   online backup API, so the copy is consistent even while requests keep
//!   appending.
//! - [`RetentionPolicy`] keeps the most recent `N` snapshots and deletes the rest.
//! - [`BackupScheduler`] runs snapshot + trim cycles on a background thread
//!   and exposes a synchronous [`BackupScheduler::backup_now`].
//!
//! # Example
//!
//! ```rust,ignore
//! use cadence::backup::{BackupScheduler, RetentionPolicy, SchedulerConfig, SqliteSnapshotter};
//! use std::sync::Arc;
//!
//! let snapshotter = Arc::new(SqliteSnapshotter::new("query_logs.db", "backups", "query_logs"));
//! let scheduler = BackupScheduler::new(snapshotter, RetentionPolicy::new(10), SchedulerConfig::default());
//!
//! scheduler.start()?;
//! let report = scheduler.backup_now()?;
//! println!("{}", report.summary());
//! scheduler.stop();
//! ```

mod retention;
mod scheduler;
mod snapshot;

pub use retention::{RetentionPolicy, TrimResult};
pub use scheduler::{BackupReport, BackupScheduler, SchedulerConfig, SchedulerState, StopOutcome};
pub use snapshot::{Snapshotter, SqliteSnapshotter};

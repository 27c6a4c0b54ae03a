//! Background backup scheduler.
//!
//! One worker thread runs snapshot + trim cycles. After a successful cycle it
//! waits the normal interval; after a failure it waits the (much shorter)
//! retry backoff. Waiting is a `recv_timeout` on the shutdown channel, so
//! `stop()` wakes the worker immediately instead of waiting out a sleep.
//!
//! Cycles are serialized by a single lock shared with [`BackupScheduler::backup_now`],
//! so a manual backup never overlaps a scheduled one.
//!
//! ```text
//!            start()                      stop()
//! Stopped ───────────► Running ─────────────────────► Stopped
//!    ▲                   │  cycle ok   → wait interval
//!    │                   │  cycle err  → wait retry_backoff
//!    └── stop() no-op    └── start() no-op ("already running")
//! ```
//!
//! A worker that dies without being stopped is reported as `Stopped` and
//! logged the next time `status()` or `start()` looks at it.

use super::retention::{RetentionPolicy, TrimResult};
use super::snapshot::{Snapshotter, SqliteSnapshotter};
use crate::config::CadenceConfig;
use crate::models::Snapshot;
use crate::storage::acquire_lock;
use crate::{Error, Result};
use std::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Name of the worker thread.
const WORKER_THREAD_NAME: &str = "cadence-backup";

/// Timing for the scheduler loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Wait after a successful cycle.
    pub interval: Duration,
    /// Wait after a failed cycle.
    pub retry_backoff: Duration,
    /// Upper bound on how long `stop()` blocks.
    pub stop_grace: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 3600),
            retry_backoff: Duration::from_secs(300),
            stop_grace: Duration::from_secs(5),
        }
    }
}

impl SchedulerConfig {
    /// Sets the normal interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the retry backoff.
    #[must_use]
    pub const fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Sets the stop grace period.
    #[must_use]
    pub const fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }
}

/// Whether the worker loop is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// The worker loop is running.
    Running,
    /// No worker loop is running.
    Stopped,
}

impl SchedulerState {
    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a call to [`BackupScheduler::stop`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The worker finished and was joined.
    Stopped,
    /// The worker did not finish within the grace period and was detached.
    /// It still exits after its current cycle.
    TimedOut,
    /// Nothing was running.
    NotRunning,
}

/// Outcome of one snapshot + trim cycle.
#[derive(Debug, Clone)]
pub struct BackupReport {
    /// The snapshot that was written.
    pub snapshot: Snapshot,
    /// What retention removed.
    pub trim: TrimResult,
    /// Wall time of the whole cycle in milliseconds.
    pub duration_ms: u64,
}

impl BackupReport {
    /// Returns a human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Snapshot {} written to {} in {}ms; {}",
            self.snapshot.id,
            self.snapshot.path.display(),
            self.duration_ms,
            self.trim.summary()
        )
    }
}

/// State shared between the scheduler handle and its worker thread.
struct Cycle {
    snapshotter: Arc<dyn Snapshotter>,
    retention: RetentionPolicy,
    lock: Mutex<()>,
}

impl Cycle {
    #[instrument(name = "cadence.backup.cycle", skip(self))]
    fn run(&self, trigger: &'static str) -> Result<BackupReport> {
        let _guard = acquire_lock(&self.lock);
        let start = Instant::now();

        let result = self.snapshotter.snapshot().and_then(|snapshot| {
            let trim = self.retention.apply(self.snapshotter.as_ref(), false)?;
            Ok(BackupReport {
                snapshot,
                trim,
                duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            })
        });

        let status = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!("cadence_backup_total", "status" => status, "trigger" => trigger)
            .increment(1);
        result
    }
}

struct Worker {
    shutdown_tx: Sender<()>,
    done_rx: Receiver<()>,
    handle: JoinHandle<()>,
}

/// Periodic snapshot + retention driver.
///
/// Construct one per process and pass it to whatever needs to stop it.
pub struct BackupScheduler {
    cycle: Arc<Cycle>,
    config: SchedulerConfig,
    worker: Mutex<Option<Worker>>,
}

impl fmt::Debug for BackupScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupScheduler")
            .field("retention", &self.cycle.retention)
            .field("config", &self.config)
            .field("state", &self.status())
            .finish_non_exhaustive()
    }
}

impl BackupScheduler {
    /// Creates a stopped scheduler.
    #[must_use]
    pub fn new(
        snapshotter: Arc<dyn Snapshotter>,
        retention: RetentionPolicy,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            cycle: Arc::new(Cycle {
                snapshotter,
                retention,
                lock: Mutex::new(()),
            }),
            config,
            worker: Mutex::new(None),
        }
    }

    /// Creates a scheduler backing up the configured query log.
    #[must_use]
    pub fn from_config(config: &CadenceConfig) -> Self {
        let snapshotter = SqliteSnapshotter::from_config(config);
        let timing = SchedulerConfig {
            interval: config.backup.interval,
            retry_backoff: config.backup.retry_backoff,
            stop_grace: config.backup.stop_grace,
        };
        Self::new(
            Arc::new(snapshotter),
            RetentionPolicy::new(config.backup.keep_count),
            timing,
        )
    }

    /// Loop timing.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Retention applied after each snapshot.
    #[must_use]
    pub fn retention(&self) -> RetentionPolicy {
        self.cycle.retention
    }

    /// The snapshotter used by every cycle.
    #[must_use]
    pub fn snapshotter(&self) -> Arc<dyn Snapshotter> {
        Arc::clone(&self.cycle.snapshotter)
    }

    /// Starts the worker loop. The first cycle runs immediately.
    ///
    /// Calling this while running is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the worker thread cannot be spawned.
    pub fn start(&self) -> Result<()> {
        let mut slot = acquire_lock(&self.worker);
        reap_exited_worker(&mut slot);
        if slot.is_some() {
            info!("Backup scheduler already running");
            return Ok(());
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();
        let cycle = Arc::clone(&self.cycle);
        let config = self.config;

        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_loop(&cycle, config, &shutdown_rx, &done_tx))
            .map_err(|e| Error::io("spawn_backup_worker", e))?;

        *slot = Some(Worker {
            shutdown_tx,
            done_rx,
            handle,
        });
        info!(
            interval_secs = self.config.interval.as_secs(),
            retry_backoff_secs = self.config.retry_backoff.as_secs(),
            keep = self.cycle.retention.keep(),
            "Backup scheduler started"
        );
        Ok(())
    }

    /// Asks the worker to exit after its current cycle.
    ///
    /// Blocks for at most the configured grace period. An in-flight cycle is
    /// never interrupted; if it outlasts the grace period the worker is
    /// detached and finishes on its own. A `start()` right after a timeout may
    /// briefly run alongside that detached worker; the cycle lock keeps their
    /// cycles serialized.
    pub fn stop(&self) -> StopOutcome {
        let Some(worker) = acquire_lock(&self.worker).take() else {
            debug!("Backup scheduler not running");
            return StopOutcome::NotRunning;
        };

        // A send error means the worker already exited.
        let _ = worker.shutdown_tx.send(());

        match worker.done_rx.recv_timeout(self.config.stop_grace) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if worker.handle.join().is_err() {
                    warn!("Backup worker panicked");
                }
                info!("Backup scheduler stopped");
                StopOutcome::Stopped
            },
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    grace_ms = u64::try_from(self.config.stop_grace.as_millis()).unwrap_or(u64::MAX),
                    "Backup cycle still running after grace period, detaching worker"
                );
                StopOutcome::TimedOut
            },
        }
    }

    /// Current state.
    pub fn status(&self) -> SchedulerState {
        let mut slot = acquire_lock(&self.worker);
        reap_exited_worker(&mut slot);
        if slot.is_some() {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    /// Runs one snapshot + trim cycle on the calling thread.
    ///
    /// Works whether or not the loop is running. Waits for any in-flight
    /// cycle to finish first.
    ///
    /// # Errors
    ///
    /// Returns the snapshot or trim error.
    pub fn backup_now(&self) -> Result<BackupReport> {
        self.cycle.run("manual")
    }
}

impl Drop for BackupScheduler {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Clears a worker that exited without being asked to.
///
/// Only `stop()` ends the loop on purpose, and it empties the slot first, so
/// a finished handle still in the slot means the worker died.
fn reap_exited_worker(slot: &mut Option<Worker>) {
    if !slot.as_ref().is_some_and(|worker| worker.handle.is_finished()) {
        return;
    }
    let Some(worker) = slot.take() else {
        return;
    };
    let panicked = worker.handle.join().is_err();
    metrics::counter!("cadence_backup_worker_exits_total").increment(1);
    warn!(panicked, "Backup worker exited unexpectedly");
}

fn run_loop(
    cycle: &Cycle,
    config: SchedulerConfig,
    shutdown_rx: &Receiver<()>,
    done_tx: &Sender<()>,
) {
    loop {
        let wait = match cycle.run("scheduled") {
            Ok(report) => {
                info!(
                    snapshot = %report.snapshot.path.display(),
                    removed = report.trim.removed.len(),
                    duration_ms = report.duration_ms,
                    "Scheduled backup completed"
                );
                config.interval
            },
            Err(e) => {
                warn!(
                    error = %e,
                    retry_in_secs = config.retry_backoff.as_secs(),
                    "Scheduled backup failed, retrying after backoff"
                );
                config.retry_backoff
            },
        };

        match shutdown_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {},
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    let _ = done_tx.send(());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SnapshotId;
    use chrono::{NaiveDate, TimeDelta};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeSnapshotter {
        attempts: AtomicUsize,
        fail_first: usize,
        panic_first: usize,
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        snapshots: Mutex<Vec<Snapshot>>,
    }

    impl FakeSnapshotter {
        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl Snapshotter for FakeSnapshotter {
        fn snapshot(&self) -> Result<Snapshot> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            assert!(attempt > self.panic_first, "snapshot attempt {attempt} blew up");
            let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
            thread::sleep(self.delay);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if attempt <= self.fail_first {
                return Err(Error::io("open_backup_source", "disk unavailable"));
            }
            let base = NaiveDate::from_ymd_opt(2026, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap();
            let id = SnapshotId::new(base + TimeDelta::seconds(i64::try_from(attempt).unwrap()), 0);
            let snapshot = Snapshot {
                id,
                path: PathBuf::from(id.file_name("query_logs")),
            };
            self.snapshots.lock().unwrap().push(snapshot.clone());
            Ok(snapshot)
        }

        fn list(&self) -> Result<Vec<Snapshot>> {
            Ok(self.snapshots.lock().unwrap().clone())
        }

        fn remove(&self, snapshot: &Snapshot) -> Result<()> {
            self.snapshots.lock().unwrap().retain(|s| s.id != snapshot.id);
            Ok(())
        }
    }

    fn wait_until(condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    fn long_interval() -> SchedulerConfig {
        SchedulerConfig::default()
            .with_interval(Duration::from_secs(3600))
            .with_retry_backoff(Duration::from_millis(10))
            .with_stop_grace(Duration::from_secs(2))
    }

    fn scheduler(fake: &Arc<FakeSnapshotter>, keep: usize, config: SchedulerConfig) -> BackupScheduler {
        BackupScheduler::new(
            Arc::clone(fake) as Arc<dyn Snapshotter>,
            RetentionPolicy::new(keep),
            config,
        )
    }

    #[test]
    fn test_failed_cycle_retries_after_backoff() {
        let fake = Arc::new(FakeSnapshotter {
            fail_first: 2,
            ..Default::default()
        });
        let scheduler = scheduler(&fake, 10, long_interval());

        scheduler.start().unwrap();
        assert!(wait_until(|| fake.list().unwrap().len() == 1));
        assert_eq!(fake.attempts(), 3);
        assert_eq!(scheduler.status(), SchedulerState::Running);
        assert_eq!(scheduler.stop(), StopOutcome::Stopped);
    }

    #[test]
    fn test_start_is_idempotent() {
        let fake = Arc::new(FakeSnapshotter::default());
        let scheduler = scheduler(&fake, 10, long_interval());

        scheduler.start().unwrap();
        scheduler.start().unwrap();
        assert!(wait_until(|| fake.attempts() >= 1));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(fake.attempts(), 1);
        assert_eq!(scheduler.stop(), StopOutcome::Stopped);
    }

    #[test]
    fn test_stop_is_responsive_and_idempotent() {
        let fake = Arc::new(FakeSnapshotter::default());
        let scheduler = scheduler(&fake, 10, long_interval());

        assert_eq!(scheduler.stop(), StopOutcome::NotRunning);
        scheduler.start().unwrap();
        assert!(wait_until(|| fake.attempts() == 1));

        let started = Instant::now();
        assert_eq!(scheduler.stop(), StopOutcome::Stopped);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(scheduler.status(), SchedulerState::Stopped);
        assert_eq!(scheduler.stop(), StopOutcome::NotRunning);
    }

    #[test]
    fn test_stop_then_start_resumes() {
        let fake = Arc::new(FakeSnapshotter::default());
        let scheduler = scheduler(&fake, 10, long_interval());

        scheduler.start().unwrap();
        assert!(wait_until(|| fake.attempts() == 1));
        assert_eq!(scheduler.stop(), StopOutcome::Stopped);

        scheduler.start().unwrap();
        assert!(wait_until(|| fake.attempts() == 2));
        assert_eq!(scheduler.status(), SchedulerState::Running);
        assert_eq!(scheduler.stop(), StopOutcome::Stopped);
    }

    #[test]
    fn test_dead_worker_reports_stopped_and_restarts() {
        let fake = Arc::new(FakeSnapshotter {
            panic_first: 1,
            ..Default::default()
        });
        let scheduler = scheduler(&fake, 10, long_interval());

        scheduler.start().unwrap();
        assert!(wait_until(|| scheduler.status() == SchedulerState::Stopped));
        assert_eq!(fake.attempts(), 1);
        assert_eq!(scheduler.stop(), StopOutcome::NotRunning);

        scheduler.start().unwrap();
        assert!(wait_until(|| fake.list().unwrap().len() == 1));
        assert_eq!(scheduler.status(), SchedulerState::Running);
        assert_eq!(scheduler.stop(), StopOutcome::Stopped);
    }

    #[test]
    fn test_start_replaces_dead_worker() {
        let fake = Arc::new(FakeSnapshotter {
            panic_first: 1,
            ..Default::default()
        });
        let scheduler = scheduler(&fake, 10, long_interval());

        scheduler.start().unwrap();
        assert!(wait_until(|| fake.attempts() == 1));
        thread::sleep(Duration::from_millis(100));

        // No status() call in between: start() itself notices the dead worker.
        scheduler.start().unwrap();
        assert!(wait_until(|| fake.attempts() == 2));
        assert!(wait_until(|| fake.list().unwrap().len() == 1));
        assert_eq!(scheduler.stop(), StopOutcome::Stopped);
    }

    #[test]
    fn test_stop_gives_up_after_grace_without_aborting_cycle() {
        let fake = Arc::new(FakeSnapshotter {
            delay: Duration::from_millis(300),
            ..Default::default()
        });
        let config = long_interval().with_stop_grace(Duration::from_millis(20));
        let scheduler = scheduler(&fake, 10, config);

        scheduler.start().unwrap();
        assert!(wait_until(|| fake.in_flight.load(Ordering::SeqCst) == 1));
        assert_eq!(scheduler.stop(), StopOutcome::TimedOut);
        assert_eq!(scheduler.status(), SchedulerState::Stopped);

        // The detached cycle still completes.
        assert!(wait_until(|| fake.list().unwrap().len() == 1));
    }

    #[test]
    fn test_restart_after_timed_out_stop_keeps_cycles_serialized() {
        let fake = Arc::new(FakeSnapshotter {
            delay: Duration::from_millis(200),
            ..Default::default()
        });
        let config = long_interval().with_stop_grace(Duration::from_millis(20));
        let scheduler = scheduler(&fake, 10, config);

        scheduler.start().unwrap();
        assert!(wait_until(|| fake.in_flight.load(Ordering::SeqCst) == 1));
        assert_eq!(scheduler.stop(), StopOutcome::TimedOut);

        scheduler.start().unwrap();
        assert!(wait_until(|| fake.list().unwrap().len() == 2));
        assert_eq!(fake.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.stop(), StopOutcome::Stopped);
    }

    #[test]
    fn test_backup_now_serializes_concurrent_callers() {
        let fake = Arc::new(FakeSnapshotter {
            delay: Duration::from_millis(20),
            ..Default::default()
        });
        let scheduler = Arc::new(scheduler(&fake, 100, long_interval()));
        scheduler.start().unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let scheduler = Arc::clone(&scheduler);
                thread::spawn(move || scheduler.backup_now())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(scheduler.stop(), StopOutcome::Stopped);
        assert_eq!(fake.attempts(), 5);
        assert_eq!(fake.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backup_now_reports_failure_and_works_while_stopped() {
        let fake = Arc::new(FakeSnapshotter {
            fail_first: 1,
            ..Default::default()
        });
        let scheduler = scheduler(&fake, 2, long_interval());

        assert!(matches!(scheduler.backup_now(), Err(Error::Io { .. })));
        let report = scheduler.backup_now().unwrap();
        assert!(report.trim.removed.is_empty());
        assert_eq!(scheduler.status(), SchedulerState::Stopped);
    }

    #[test]
    fn test_cycle_applies_retention() {
        let fake = Arc::new(FakeSnapshotter::default());
        let scheduler = scheduler(&fake, 2, long_interval());

        for _ in 0..3 {
            scheduler.backup_now().unwrap();
        }
        let report = scheduler.backup_now().unwrap();
        assert_eq!(report.trim.removed.len(), 1);
        assert_eq!(fake.list().unwrap().len(), 2);
    }
}

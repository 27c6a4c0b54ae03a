//! Backup command handlers.

use cadence::backup::{BackupScheduler, RetentionPolicy, Snapshotter, SqliteSnapshotter};
use cadence::config::CadenceConfig;
use cadence::storage::SqliteQueryLog;

use super::BackupAction;

/// Backup command.
pub fn cmd_backup(
    config: &CadenceConfig,
    action: BackupAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        BackupAction::Now => backup_now(config),
        BackupAction::List { json } => list(config, json),
        BackupAction::Trim { keep, dry_run } => trim(config, keep, dry_run),
    }
}

fn backup_now(config: &CadenceConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Opening the log creates the database and schema on a fresh install.
    let _log = SqliteQueryLog::open(config.query_log_path(), &config.storage)?;
    let scheduler = BackupScheduler::from_config(config);
    let report = scheduler.backup_now()?;
    println!("{}", report.summary());
    Ok(())
}

fn list(config: &CadenceConfig, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let snapshotter = SqliteSnapshotter::from_config(config);
    let snapshots = snapshotter.list()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshots)?);
        return Ok(());
    }

    if snapshots.is_empty() {
        println!("No snapshots in {}", snapshotter.backup_dir().display());
        return Ok(());
    }

    println!("Snapshots in {}:", snapshotter.backup_dir().display());
    for snapshot in &snapshots {
        let name = snapshot
            .path
            .file_name()
            .map_or_else(|| snapshot.id.to_string(), |n| n.to_string_lossy().into_owned());
        println!("  {name}");
    }
    println!();
    println!(
        "{} snapshot(s), keeping {}",
        snapshots.len(),
        config.backup.keep_count
    );
    Ok(())
}

fn trim(
    config: &CadenceConfig,
    keep: Option<usize>,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let keep = keep.unwrap_or(config.backup.keep_count);
    if keep == 0 {
        return Err("--keep must be at least 1".into());
    }
    let snapshotter = SqliteSnapshotter::from_config(config);
    let result = RetentionPolicy::new(keep).apply(&snapshotter, dry_run)?;
    println!("{}", result.summary());
    for id in &result.removed {
        println!("  - {}", id.file_name(&config.backup.prefix));
    }
    Ok(())
}

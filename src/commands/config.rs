//! Config command handler.

use cadence::config::CadenceConfig;

/// Config command.
pub fn cmd_config(config: &CadenceConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Current Configuration");
    println!("=====================");
    println!();

    println!("Dataset:");
    println!("  Path: {}", config.dataset.path.display());
    println!("  Name Column: {}", config.dataset.name_column);
    println!("  Feature Columns: {}", config.dataset.feature_columns.join(", "));
    println!();

    println!("Clustering:");
    println!("  k: {}", config.clustering.k);
    println!("  Seed: {}", config.clustering.seed);
    println!("  Max Iterations: {}", config.clustering.max_iter);
    println!("  Tolerance: {}", config.clustering.tolerance);
    println!();

    println!("Default Recommendations: {}", config.default_recommendations);
    println!("Data Directory: {}", config.data_dir.display());
    println!();

    println!("Query Log:");
    println!("  Path: {}", config.query_log_path().display());
    println!("  WAL: {}", config.storage.wal);
    println!("  Synchronous: {}", config.storage.synchronous.as_str());
    println!();

    println!("Backups:");
    println!("  Enabled: {}", config.backup.enabled);
    println!("  Directory: {}", config.backup_dir().display());
    println!("  Prefix: {}", config.backup.prefix);
    println!("  Interval: {}h", config.backup.interval.as_secs() / 3600);
    println!("  Retry Backoff: {}s", config.backup.retry_backoff.as_secs());
    println!("  Keep: {}", config.backup.keep_count);
    println!("  Stop Grace: {}s", config.backup.stop_grace.as_secs());

    Ok(())
}

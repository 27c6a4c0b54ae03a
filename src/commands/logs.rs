//! Logs command handler.

use cadence::config::CadenceConfig;
use cadence::storage::{QueryLogBackend, SqliteQueryLog};

/// Logs command.
pub fn cmd_logs(
    config: &CadenceConfig,
    limit: usize,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let log = SqliteQueryLog::open(config.query_log_path(), &config.storage)?;
    let entries = log.recent(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No queries logged yet");
        return Ok(());
    }

    println!("Recent queries ({} of {}):", entries.len(), log.count()?);
    println!();
    for entry in &entries {
        let status = if entry.success { "ok" } else { "failed" };
        println!(
            "  {} {}  {:<6} {:>3}  {}",
            entry.date, entry.time, status, entry.num_results, entry.query
        );
    }

    Ok(())
}

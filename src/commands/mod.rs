//! Command handlers module.
//!
//! - `catalog.rs`: recommend, songs and info
//! - `logs.rs`: query log listing
//! - `backup.rs`: manual snapshot, listing and trimming
//! - `serve.rs`: JSON-lines request loop with the backup scheduler running
//! - `config.rs`: effective configuration display

mod backup;
mod catalog;
mod config;
mod logs;
mod serve;

use cadence::Recommendation;
use clap::Subcommand;
use serde_json::{Value, json};

pub use backup::cmd_backup;
pub use catalog::{cmd_info, cmd_recommend, cmd_songs};
pub use config::cmd_config;
pub use logs::cmd_logs;
pub use serve::cmd_serve;

/// Backup subcommands.
#[derive(Subcommand)]
pub enum BackupAction {
    /// Take a snapshot now and apply retention.
    Now,

    /// List existing snapshots, oldest first.
    List {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Delete snapshots beyond the retention count.
    Trim {
        /// Number of snapshots to keep (defaults to `backup.keep_count`).
        #[arg(long)]
        keep: Option<usize>,

        /// Show what would be removed without deleting anything.
        #[arg(long)]
        dry_run: bool,
    },
}

/// Renders a recommendation outcome as the JSON response shape shared by
/// `recommend --json` and `serve`.
///
/// Errors carry a `kind` tag so callers can tell a failure from an empty result.
pub fn render_response(result: &cadence::Result<Recommendation>) -> Value {
    match result {
        Ok(recommendation) => json!({
            "success": true,
            "original_song": recommendation.original_song,
            "recommendations": recommendation.recommendations,
        }),
        Err(e) => json!({
            "success": false,
            "error": e.to_string(),
            "kind": e.kind(),
        }),
    }
}

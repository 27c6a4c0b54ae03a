//! Binary entry point for cadence.
//!
//! This binary provides the CLI interface for the cadence recommender.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use cadence::config::CadenceConfig;
use cadence::observability;
use clap::{Parser, Subcommand};
use commands::{
    BackupAction, cmd_backup, cmd_config, cmd_info, cmd_logs, cmd_recommend, cmd_serve, cmd_songs,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Cadence - song recommendations from feature clustering.
#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Dataset CSV path (overrides config and `CADENCE_DATASET`).
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// Number of clusters (overrides config and `CADENCE_CLUSTERS`).
    #[arg(short = 'k', long, global = true)]
    clusters: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Recommend songs similar to a given song.
    Recommend {
        /// Name of the song to find neighbours for.
        song: String,

        /// Number of recommendations (defaults to `recommend.default_count`).
        #[arg(short = 'n', long, allow_negative_numbers = true)]
        count: Option<i64>,

        /// Print the JSON response instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// List every song in the catalog.
    Songs {
        /// Print JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show catalog and cluster statistics.
    Info {
        /// Print JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show recent query log entries.
    Logs {
        /// Maximum number of entries.
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Print JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage query log snapshots.
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },

    /// Show the effective configuration.
    Config,

    /// Answer JSON-line requests on stdin while backups run in the background.
    Serve,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = observability::init_from_env(cli.verbose) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Resolves configuration: defaults, file, environment, then CLI flags.
fn load_config(cli: &Cli) -> cadence::Result<CadenceConfig> {
    let config = match cli.config.as_deref() {
        Some(path) => CadenceConfig::load_from_file(path)?,
        None => CadenceConfig::load_default()?,
    };
    let mut config = config.with_env_overrides();

    if let Some(dataset) = &cli.dataset {
        config.dataset.path.clone_from(dataset);
    }
    if let Some(k) = cli.clusters {
        config.clustering.k = k;
    }

    config.validate()?;
    Ok(config)
}

/// Runs the selected command.
fn run_command(command: Commands, config: CadenceConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Recommend { song, count, json } => cmd_recommend(config, song, count, json),
        Commands::Songs { json } => cmd_songs(config, json),
        Commands::Info { json } => cmd_info(config, json),
        Commands::Logs { limit, json } => cmd_logs(&config, limit, json),
        Commands::Backup { action } => cmd_backup(&config, action),
        Commands::Config => cmd_config(&config),
        Commands::Serve => cmd_serve(config),
    }
}

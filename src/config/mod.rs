//! Configuration management.
//!
//! Values are resolved from, lowest to highest precedence: built-in
//! defaults, a TOML file, `CADENCE_*` environment variables and finally
//! command-line flags applied by the binary.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the dataset path.
pub const DATASET_ENV: &str = "CADENCE_DATASET";
/// Environment variable overriding the cluster count.
pub const CLUSTERS_ENV: &str = "CADENCE_CLUSTERS";
/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "CADENCE_DATA_DIR";
/// Environment variable overriding the backup interval in hours.
pub const BACKUP_INTERVAL_ENV: &str = "CADENCE_BACKUP_INTERVAL_HOURS";
/// Environment variable overriding the backup retention count.
pub const BACKUP_KEEP_ENV: &str = "CADENCE_BACKUP_KEEP";
/// Environment variable enabling or disabling scheduled backups.
pub const BACKUP_ENABLED_ENV: &str = "CADENCE_BACKUP_ENABLED";

/// Default feature columns of the song catalog.
pub const DEFAULT_FEATURE_COLUMNS: [&str; 4] = ["danceability", "energy", "tempo", "Valence"];

/// Main configuration for cadence.
#[derive(Debug, Clone, PartialEq)]
pub struct CadenceConfig {
    /// Tabular item source.
    pub dataset: DatasetConfig,
    /// Clustering parameters.
    pub clustering: ClusterConfig,
    /// Number of recommendations when a request does not specify one.
    pub default_recommendations: usize,
    /// Root directory for the query log and backups.
    pub data_dir: PathBuf,
    /// Query log storage.
    pub storage: StorageConfig,
    /// Backup scheduling and retention.
    pub backup: BackupConfig,
}

/// Location and column mapping of the song catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetConfig {
    /// CSV file path.
    pub path: PathBuf,
    /// Column holding the song name.
    pub name_column: String,
    /// Numeric feature columns, in vector order.
    pub feature_columns: Vec<String>,
    /// Column holding the release date.
    pub released_date_column: String,
    /// Column holding the singer.
    pub singer_column: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("Hindi_songs.csv"),
            name_column: "song_name".to_string(),
            feature_columns: DEFAULT_FEATURE_COLUMNS.iter().map(ToString::to_string).collect(),
            released_date_column: "released_date".to_string(),
            singer_column: "singer".to_string(),
        }
    }
}

/// Clustering parameters, fixed at configuration time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterConfig {
    /// Number of clusters.
    pub k: usize,
    /// Seed for deterministic centroid initialization.
    pub seed: u64,
    /// Maximum Lloyd iterations.
    pub max_iter: usize,
    /// Convergence tolerance on centroid movement.
    pub tolerance: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            k: 4,
            seed: 42,
            max_iter: 300,
            tolerance: 1e-4,
        }
    }
}

impl ClusterConfig {
    /// Creates a config with `k` clusters and default iteration settings.
    #[must_use]
    pub fn with_k(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    /// Sets the initialization seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// `SQLite` synchronous level for the query log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Synchronous {
    /// No syncs.
    Off,
    /// Sync at checkpoints (safe with WAL).
    #[default]
    Normal,
    /// Sync on every commit.
    Full,
    /// Full plus directory syncs.
    Extra,
}

impl Synchronous {
    /// Returns the pragma value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Normal => "NORMAL",
            Self::Full => "FULL",
            Self::Extra => "EXTRA",
        }
    }

    /// Parses a pragma value, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OFF" => Some(Self::Off),
            "NORMAL" => Some(Self::Normal),
            "FULL" => Some(Self::Full),
            "EXTRA" => Some(Self::Extra),
            _ => None,
        }
    }
}

/// Query log storage settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Explicit query log path; defaults to `<data_dir>/query_logs.db`.
    pub query_log: Option<PathBuf>,
    /// Use write-ahead logging.
    pub wal: bool,
    /// Synchronous level.
    pub synchronous: Synchronous,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            query_log: None,
            wal: true,
            synchronous: Synchronous::Normal,
        }
    }
}

/// Backup scheduling and retention settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    /// Take an initial backup and run the scheduler in `serve`.
    pub enabled: bool,
    /// Explicit backup directory; defaults to `<data_dir>/backups`.
    pub dir: Option<PathBuf>,
    /// Snapshot file name prefix.
    pub prefix: String,
    /// Normal interval between cycles.
    pub interval: Duration,
    /// Delay before retrying a failed cycle.
    pub retry_backoff: Duration,
    /// Number of snapshots to keep.
    pub keep_count: usize,
    /// How long `stop()` waits for the current cycle.
    pub stop_grace: Duration,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            prefix: "query_logs".to_string(),
            interval: Duration::from_secs(24 * 3600),
            retry_backoff: Duration::from_secs(300),
            keep_count: 10,
            stop_grace: Duration::from_secs(5),
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Dataset section.
    pub dataset: Option<ConfigFileDataset>,
    /// Clustering section.
    pub clustering: Option<ConfigFileClustering>,
    /// Recommendation section.
    pub recommend: Option<ConfigFileRecommend>,
    /// Storage section.
    pub storage: Option<ConfigFileStorage>,
    /// Backup section.
    pub backup: Option<ConfigFileBackup>,
}

/// `[dataset]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileDataset {
    /// CSV path.
    pub path: Option<String>,
    /// Name column.
    pub name_column: Option<String>,
    /// Feature columns.
    pub feature_columns: Option<Vec<String>>,
    /// Release date column.
    pub released_date_column: Option<String>,
    /// Singer column.
    pub singer_column: Option<String>,
}

/// `[clustering]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileClustering {
    /// Cluster count.
    pub k: Option<usize>,
    /// Seed.
    pub seed: Option<u64>,
    /// Iteration cap.
    pub max_iter: Option<usize>,
    /// Tolerance.
    pub tolerance: Option<f64>,
}

/// `[recommend]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileRecommend {
    /// Default result count.
    pub default_count: Option<usize>,
}

/// `[storage]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileStorage {
    /// Query log path.
    pub query_log: Option<String>,
    /// WAL toggle.
    pub wal: Option<bool>,
    /// Synchronous level.
    pub synchronous: Option<String>,
}

/// `[backup]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileBackup {
    /// Enabled toggle.
    pub enabled: Option<bool>,
    /// Backup directory.
    pub dir: Option<String>,
    /// File prefix.
    pub prefix: Option<String>,
    /// Interval in hours.
    pub interval_hours: Option<u64>,
    /// Retry backoff in seconds.
    pub retry_backoff_secs: Option<u64>,
    /// Retention count.
    pub keep_count: Option<usize>,
    /// Stop grace period in seconds.
    pub stop_grace_secs: Option<u64>,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            clustering: ClusterConfig::default(),
            default_recommendations: 5,
            data_dir: PathBuf::from(".cadence"),
            storage: StorageConfig::default(),
            backup: BackupConfig::default(),
        }
    }
}

impl CadenceConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::io("read_config_file", format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the TOML is malformed or a value is invalid.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)
            .map_err(|e| Error::Validation(format!("invalid config file: {e}")))?;
        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks `<platform config dir>/cadence/config.toml`, then
    /// `~/.config/cadence/config.toml`. Returns defaults if neither exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or parsed.
    pub fn load_default() -> Result<Self> {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Ok(Self::default());
        };

        let candidates = [
            base_dirs.config_dir().join("cadence").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("cadence")
                .join("config.toml"),
        ];

        candidates
            .iter()
            .find(|path| path.exists())
            .map_or_else(|| Ok(Self::default()), |path| Self::load_from_file(path))
    }

    /// Converts a `ConfigFile` to `CadenceConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(dataset) = file.dataset {
            if let Some(path) = dataset.path {
                config.dataset.path = PathBuf::from(path);
            }
            if let Some(v) = dataset.name_column {
                config.dataset.name_column = v;
            }
            if let Some(v) = dataset.feature_columns {
                config.dataset.feature_columns = v;
            }
            if let Some(v) = dataset.released_date_column {
                config.dataset.released_date_column = v;
            }
            if let Some(v) = dataset.singer_column {
                config.dataset.singer_column = v;
            }
        }
        if let Some(clustering) = file.clustering {
            if let Some(k) = clustering.k {
                config.clustering.k = k;
            }
            if let Some(seed) = clustering.seed {
                config.clustering.seed = seed;
            }
            if let Some(max_iter) = clustering.max_iter {
                config.clustering.max_iter = max_iter;
            }
            if let Some(tolerance) = clustering.tolerance {
                config.clustering.tolerance = tolerance;
            }
        }
        if let Some(count) = file.recommend.and_then(|r| r.default_count) {
            config.default_recommendations = count;
        }
        if let Some(storage) = file.storage {
            if let Some(path) = storage.query_log {
                config.storage.query_log = Some(PathBuf::from(path));
            }
            if let Some(wal) = storage.wal {
                config.storage.wal = wal;
            }
            if let Some(level) = storage.synchronous {
                config.storage.synchronous = Synchronous::parse(&level).ok_or_else(|| {
                    Error::Validation(format!(
                        "storage.synchronous must be OFF, NORMAL, FULL or EXTRA, got '{level}'"
                    ))
                })?;
            }
        }
        if let Some(backup) = file.backup {
            if let Some(enabled) = backup.enabled {
                config.backup.enabled = enabled;
            }
            if let Some(dir) = backup.dir {
                config.backup.dir = Some(PathBuf::from(dir));
            }
            if let Some(prefix) = backup.prefix {
                config.backup.prefix = prefix;
            }
            if let Some(hours) = backup.interval_hours {
                config.backup.interval = Duration::from_secs(hours.saturating_mul(3600));
            }
            if let Some(secs) = backup.retry_backoff_secs {
                config.backup.retry_backoff = Duration::from_secs(secs);
            }
            if let Some(keep) = backup.keep_count {
                config.backup.keep_count = keep;
            }
            if let Some(secs) = backup.stop_grace_secs {
                config.backup.stop_grace = Duration::from_secs(secs);
            }
        }

        Ok(config)
    }

    /// Applies `CADENCE_*` environment overrides.
    ///
    /// Unparseable values are ignored with a warning.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(DATASET_ENV) {
            self.dataset.path = PathBuf::from(path);
        }
        if let Some(k) = parse_env(&lookup, CLUSTERS_ENV) {
            self.clustering.k = k;
        }
        if let Some(dir) = lookup(DATA_DIR_ENV) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(hours) = parse_env::<u64>(&lookup, BACKUP_INTERVAL_ENV) {
            self.backup.interval = Duration::from_secs(hours.saturating_mul(3600));
        }
        if let Some(keep) = parse_env(&lookup, BACKUP_KEEP_ENV) {
            self.backup.keep_count = keep;
        }
        if let Some(enabled) = parse_env(&lookup, BACKUP_ENABLED_ENV) {
            self.backup.enabled = enabled;
        }
        self
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.clustering.k == 0 {
            return Err(Error::Validation("clustering.k must be at least 1".to_string()));
        }
        if self.clustering.max_iter == 0 {
            return Err(Error::Validation(
                "clustering.max_iter must be at least 1".to_string(),
            ));
        }
        if !self.clustering.tolerance.is_finite() || self.clustering.tolerance < 0.0 {
            return Err(Error::Validation(
                "clustering.tolerance must be a non-negative number".to_string(),
            ));
        }
        if self.dataset.feature_columns.is_empty() {
            return Err(Error::Validation(
                "dataset.feature_columns must not be empty".to_string(),
            ));
        }
        if self.backup.interval.is_zero() {
            return Err(Error::Validation(
                "backup.interval_hours must be greater than 0".to_string(),
            ));
        }
        if self.backup.retry_backoff > self.backup.interval {
            return Err(Error::Validation(
                "backup.retry_backoff_secs must not exceed the backup interval".to_string(),
            ));
        }
        if self.backup.keep_count == 0 {
            return Err(Error::Validation(
                "backup.keep_count must be at least 1".to_string(),
            ));
        }
        if self.backup.prefix.is_empty() || self.backup.prefix.contains(['/', '\\']) {
            return Err(Error::Validation(
                "backup.prefix must be a non-empty file name fragment".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the query log database path.
    #[must_use]
    pub fn query_log_path(&self) -> PathBuf {
        self.storage
            .query_log
            .clone()
            .unwrap_or_else(|| self.data_dir.join("query_logs.db"))
    }

    /// Returns the backup directory.
    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        self.backup
            .dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("backups"))
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets the dataset path.
    #[must_use]
    pub fn with_dataset_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dataset.path = path.into();
        self
    }
}

fn parse_env<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        tracing::warn!(key, value = %raw, "Ignoring unparseable environment override");
    }
    parsed
}

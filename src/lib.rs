//! # Cadence
//!
//! Song recommendations from feature-based clustering.
//!
//! Cadence loads a tabular song catalog once at startup, normalizes the
//! numeric audio features, partitions the catalog into `k` clusters and
//! answers "songs like this one" queries by ranking the query's cluster
//! peers with cosine similarity. Every query is appended to a `SQLite`
//! query log which a background scheduler snapshots on a fixed interval,
//! keeping only the most recent snapshots.
//!
//! ## Features
//!
//! - Deterministic k-means clustering over standardized features
//! - In-cluster cosine similarity ranking with stable tie-breaks
//! - Append-only `SQLite` query log in WAL mode
//! - Consistent online snapshots through the `SQLite` backup API
//! - Background backup scheduler with retry backoff and retention trimming
//!
//! ## Example
//!
//! ```rust,ignore
//! use cadence::catalog::{ClusterAssigner, load_items};
//! use cadence::config::CadenceConfig;
//! use cadence::services::RecommendationService;
//! use std::sync::Arc;
//!
//! let config = CadenceConfig::default();
//! let rows = load_items(&config.dataset)?;
//! let store = ClusterAssigner::new(config.clustering)
//!     .assign(rows, config.dataset.feature_columns.clone())?;
//! let service = RecommendationService::new(Arc::new(store));
//! let result = service.recommend("Tum Hi Ho", 5)?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod backup;
pub mod catalog;
pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use backup::{BackupScheduler, RetentionPolicy, SchedulerState, Snapshotter, SqliteSnapshotter};
pub use catalog::{ClusterAssigner, FeatureStore};
pub use config::CadenceConfig;
pub use models::{DatasetInfo, Item, Recommendation, Snapshot, SnapshotId, SongSummary};
pub use services::{QueryService, RecommendRequest, RecommendationService, ServiceContainer};
pub use storage::SqliteQueryLog;

/// Error type for cadence operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Data` | Dataset is unusable for clustering (no complete rows, `k` too large, missing columns) |
/// | `NotFound` | The queried song is unknown or was excluded from clustering |
/// | `Validation` | A parameter is out of range (empty song name, negative count, bad config) |
/// | `Io` | Snapshot, query log, dataset or config file storage failures |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Input data is malformed or insufficient.
    ///
    /// Raised when:
    /// - Every row is missing at least one feature
    /// - `k` exceeds the number of rows with complete features
    /// - The dataset lacks the identifier or a feature column
    #[error("data error: {0}")]
    Data(String),

    /// The requested item does not exist.
    ///
    /// Raised when the query song is absent from the catalog or carries no
    /// cluster label because its features were incomplete.
    #[error("not found: {0}")]
    NotFound(String),

    /// A parameter failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// A storage operation failed.
    ///
    /// Raised when:
    /// - The backup directory cannot be created
    /// - The source database is missing or unreadable
    /// - The `SQLite` backup or query log statements fail
    /// - Dataset or configuration files cannot be read
    #[error("io error during '{operation}': {cause}")]
    Io {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds an [`Error::Io`] from an operation name and any displayable cause.
    pub fn io(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::Io {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Returns a stable, lowercase tag for the error category.
    ///
    /// The request layer uses this to report structured errors that callers
    /// can tell apart from an empty successful result.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Data(_) => "data",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Io { .. } => "io",
        }
    }
}

/// Result type alias for cadence operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
///
/// # Examples
///
/// ```rust
/// use cadence::current_timestamp;
///
/// let ts = current_timestamp();
/// assert!(ts > 0);
/// ```
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

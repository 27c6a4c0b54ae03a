//! Explicit dependency root.
//!
//! Built once at process startup; whatever needs the scheduler at shutdown
//! receives it from here rather than from a global.

use super::{QueryService, RecommendationService};
use crate::Result;
use crate::backup::BackupScheduler;
use crate::catalog::{self, FeatureStore};
use crate::config::CadenceConfig;
use crate::storage::{QueryLogBackend, SqliteQueryLog};
use std::sync::Arc;
use tracing::{info, instrument};

/// Owns the feature store, the query log and the backup scheduler.
pub struct ServiceContainer {
    config: CadenceConfig,
    store: Arc<FeatureStore>,
    query_log: Arc<SqliteQueryLog>,
    scheduler: Arc<BackupScheduler>,
}

impl ServiceContainer {
    /// Validates `config`, builds the feature store and opens the query log.
    ///
    /// The scheduler is created stopped.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Validation`] if the configuration is invalid
    /// - [`crate::Error::Data`] if the dataset cannot be clustered
    /// - [`crate::Error::Io`] if the dataset or the query log cannot be opened
    #[instrument(skip_all, fields(dataset = %config.dataset.path.display(), k = config.clustering.k))]
    pub fn from_config(config: CadenceConfig) -> Result<Self> {
        config.validate()?;
        let store = catalog::build_feature_store(&config.dataset, config.clustering)?;
        let query_log = SqliteQueryLog::open(config.query_log_path(), &config.storage)?;
        let scheduler = BackupScheduler::from_config(&config);

        info!(
            songs = store.len(),
            unlabeled = store.unlabeled_count(),
            query_log = %query_log.path().display(),
            "Services initialized"
        );

        Ok(Self {
            config,
            store: Arc::new(store),
            query_log: Arc::new(query_log),
            scheduler: Arc::new(scheduler),
        })
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> &CadenceConfig {
        &self.config
    }

    /// The immutable feature store.
    #[must_use]
    pub fn store(&self) -> Arc<FeatureStore> {
        Arc::clone(&self.store)
    }

    /// Recommendation engine over the feature store.
    #[must_use]
    pub fn recommendations(&self) -> RecommendationService {
        RecommendationService::new(Arc::clone(&self.store))
    }

    /// Request layer that validates, recommends and logs.
    #[must_use]
    pub fn queries(&self) -> QueryService {
        let log: Arc<dyn QueryLogBackend> = Arc::clone(&self.query_log) as Arc<dyn QueryLogBackend>;
        QueryService::new(
            self.recommendations(),
            Some(log),
            self.config.default_recommendations,
        )
    }

    /// The query log.
    #[must_use]
    pub fn query_log(&self) -> Arc<SqliteQueryLog> {
        Arc::clone(&self.query_log)
    }

    /// The backup scheduler for the query log.
    #[must_use]
    pub fn scheduler(&self) -> Arc<BackupScheduler> {
        Arc::clone(&self.scheduler)
    }
}

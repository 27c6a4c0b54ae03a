//! Storage backend traits.

use crate::Result;
use crate::models::{NewQueryLogEntry, QueryLogEntry};

/// Append-only store of request records.
///
/// Implementations must be safe to share across request threads.
pub trait QueryLogBackend: Send + Sync {
    /// Appends an entry and returns its row id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the write fails.
    fn record(&self, entry: &NewQueryLogEntry) -> Result<i64>;

    /// Returns up to `limit` entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the read fails.
    fn recent(&self, limit: usize) -> Result<Vec<QueryLogEntry>>;

    /// Returns the total number of entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the read fails.
    fn count(&self) -> Result<u64>;
}

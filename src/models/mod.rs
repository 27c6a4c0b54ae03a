//! Data models for cadence.
//!
//! This module contains the core data structures shared by the catalog,
//! the recommendation services and the backup subsystem.

mod item;
mod query_log;
mod recommendation;
mod snapshot;

pub use item::{ClusterId, Item, ItemMetadata, RawItem, SongSummary};
pub use query_log::{NewQueryLogEntry, QueryLogEntry, QueryType};
pub use recommendation::{DatasetInfo, Recommendation, ScoredSong};
pub use snapshot::{Snapshot, SnapshotId};

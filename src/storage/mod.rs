//! Persistent storage for the query log.
//!
//! The query log is the only persisted state. It lives in a `SQLite` file in
//! WAL mode so the backup subsystem can take consistent online snapshots
//! while requests keep appending.

mod connection;
mod query_log;
mod traits;

pub use connection::{BUSY_TIMEOUT, acquire_lock, configure_connection};
pub use query_log::{DEFAULT_RECENT_LIMIT, SqliteQueryLog};
pub use traits::QueryLogBackend;

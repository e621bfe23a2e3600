use anyhow::Result;
use std::collections::HashSet;

pub mod json_store;
pub mod models;
pub mod sqlite;

pub use json_store::JsonFileStore;
pub use sqlite::SqliteStore;

/// Current on-disk schema version for delivered-event state.
pub const STATE_SCHEMA_VERSION: u32 = 2;

/// Durable set of event ids that have already been delivered.
///
/// `load` must treat a missing or unreadable store as empty; only `save`
/// failures are surfaced.
pub trait StateStore {
    fn load(&self) -> Result<HashSet<String>>;

    fn save(&self, event_ids: &HashSet<String>) -> Result<()>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

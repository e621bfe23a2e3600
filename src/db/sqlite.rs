use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use tracing::{info, warn};

use super::{StateStore, STATE_SCHEMA_VERSION};

/// Delivered-id state kept in a SQLite database, one row per event id.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("create state db dir")?;
            }
        }
        let conn = Connection::open(path).context("open state db")?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let store = SqliteStore { conn };
        store.run_migrations()?;
        Ok(store)
    }

    #[cfg(test)]
    fn open_in_memory() -> Result<Self> {
        let store = SqliteStore {
            conn: Connection::open_in_memory()?,
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        let version: Option<u32> = self
            .conn
            .query_row("SELECT version FROM schema_meta WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        if version != Some(STATE_SCHEMA_VERSION) {
            info!("State db schema set to v{}", STATE_SCHEMA_VERSION);
            self.conn.execute(
                "INSERT INTO schema_meta (id, version) VALUES (1, ?1)
                 ON CONFLICT(id) DO UPDATE SET version=excluded.version",
                params![STATE_SCHEMA_VERSION],
            )?;
        }
        Ok(())
    }

    fn read_ids(&self) -> Result<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT event_id FROM posted_events")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(ids)
    }
}

impl StateStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn load(&self) -> Result<HashSet<String>> {
        match self.read_ids() {
            Ok(ids) => Ok(ids),
            Err(e) => {
                warn!("Failed to read state db, treating as empty: {}", e);
                Ok(HashSet::new())
            }
        }
    }

    /// Inserts every id not yet stored. Rows are never deleted.
    fn save(&self, event_ids: &HashSet<String>) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO posted_events (event_id, posted_at) VALUES (?1, ?2)
                 ON CONFLICT(event_id) DO NOTHING",
            )?;
            let now = Utc::now();
            for id in event_ids {
                stmt.execute(params![id, now])?;
            }
        }
        tx.commit().context("commit state db")?;
        Ok(())
    }
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_meta (
    id      INTEGER PRIMARY KEY,
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS posted_events (
    event_id  TEXT PRIMARY KEY,
    posted_at TEXT NOT NULL
);
"#;

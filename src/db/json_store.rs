use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::{StateStore, STATE_SCHEMA_VERSION};

/// Versioned state record as written by this bot.
#[derive(Debug, Serialize, Deserialize)]
struct StateRecord {
    schema_version: u32,
    #[serde(default)]
    posted_event_ids: Vec<String>,
}

/// Accepts both the current record and the legacy bare list of ids.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredState {
    Versioned(StateRecord),
    Legacy(Vec<String>),
}

impl StoredState {
    fn into_ids(self) -> HashSet<String> {
        match self {
            StoredState::Versioned(record) => record.posted_event_ids.into_iter().collect(),
            StoredState::Legacy(ids) => ids.into_iter().collect(),
        }
    }
}

/// Delivered-id state kept in a single JSON file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }
}

impl StateStore for JsonFileStore {
    fn name(&self) -> &str {
        "json"
    }

    fn load(&self) -> Result<HashSet<String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No state file at {}, starting empty", self.path.display());
                return Ok(HashSet::new());
            }
            Err(e) => {
                warn!("Failed to read state file {}: {}", self.path.display(), e);
                return Ok(HashSet::new());
            }
        };

        match serde_json::from_str::<StoredState>(&raw) {
            Ok(state) => {
                if let StoredState::Legacy(ids) = &state {
                    debug!("Reading legacy state list ({} ids)", ids.len());
                }
                Ok(state.into_ids())
            }
            Err(e) => {
                warn!(
                    "State file {} is corrupt, treating as empty: {}",
                    self.path.display(),
                    e
                );
                Ok(HashSet::new())
            }
        }
    }

    fn save(&self, event_ids: &HashSet<String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("create state dir")?;
            }
        }

        let mut ids: Vec<String> = event_ids.iter().cloned().collect();
        ids.sort();
        let record = StateRecord {
            schema_version: STATE_SCHEMA_VERSION,
            posted_event_ids: ids,
        };
        let payload = serde_json::to_vec_pretty(&record).context("serialize state")?;

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp).context("create state tmp")?;
            file.write_all(&payload).context("write state tmp")?;
            file.sync_all().context("sync state tmp")?;
        }

        if let Err(err) = fs::rename(&tmp, &self.path) {
            if self.path.exists() {
                if let Err(e) = fs::remove_file(&self.path) {
                    warn!(
                        "Failed to remove old state file {}: {}",
                        self.path.display(),
                        e
                    );
                }
                fs::rename(&tmp, &self.path).context("replace state file")?;
            } else {
                return Err(err).context("rename state tmp");
            }
        }
        Ok(())
    }
}

//! Capped launch history
//!
//! The file keeps at most [`HISTORY_MAX_RECORDS`](crate::constants::launch::HISTORY_MAX_RECORDS)
//! entries keyed `"1"`..`"N"`. `last_update` names the newest entry and wraps
//! back to 1, overwriting the oldest slot:
//!
//! ```json
//! {"last_update": 2, "1": {"PID": 812, "nx_version": "nx11", "build": "...", "patch": "..."}, "2": {...}}
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::launch::HISTORY_MAX_RECORDS;
use crate::errors::{HistoryError, HistoryResult};

/// One launched process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRecord {
    #[serde(rename = "PID")]
    pub pid: u32,
    pub nx_version: String,
    pub build: String,
    pub patch: String,
}

/// Rotating history of launches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    last_update: u32,
    #[serde(flatten)]
    records: BTreeMap<String, LaunchRecord>,
}

impl History {
    /// Read the history file, starting empty when it does not exist
    pub async fn load(path: &Path) -> HistoryResult<Self> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(HistoryError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&text).map_err(|e| HistoryError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Write the history file, creating its directory
    pub async fn save(&self, path: &Path) -> HistoryResult<()> {
        let io_err = |source| HistoryError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(self).map_err(|e| HistoryError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(path, text).await.map_err(io_err)
    }

    /// Store `record` in the next slot, returning the slot counter
    pub fn push(&mut self, record: LaunchRecord) -> u32 {
        let slot = if self.last_update >= HISTORY_MAX_RECORDS {
            1
        } else {
            self.last_update + 1
        };
        debug!("New entry for counter {}: {:?}", slot, record);
        self.last_update = slot;
        self.records.insert(slot.to_string(), record);
        slot
    }

    pub fn last_update(&self) -> u32 {
        self.last_update
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records from the newest back to the oldest
    pub fn newest_first(&self) -> Vec<(u32, &LaunchRecord)> {
        let newer = (1..=self.last_update).rev();
        let older = (self.last_update + 1..=HISTORY_MAX_RECORDS).rev();
        newer
            .chain(older)
            .filter_map(|slot| self.records.get(&slot.to_string()).map(|r| (slot, r)))
            .collect()
    }

    /// Newest record of the process `pid`
    pub fn find_pid(&self, pid: u32) -> Option<&LaunchRecord> {
        self.newest_first()
            .into_iter()
            .map(|(_, record)| record)
            .find(|record| record.pid == pid)
    }
}

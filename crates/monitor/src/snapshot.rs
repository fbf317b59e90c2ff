use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};

use common::{Result, StrategyStatus};

use crate::table::StatusTable;

/// Full serialized form of the status table, rewritten wholesale on every
/// change so external consumers always see a complete picture.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    /// Local ISO-8601 timestamp, second precision.
    pub updated_at: String,
    pub strategies: Vec<StrategyStatus>,
}

impl Snapshot {
    pub fn of(table: &StatusTable) -> Self {
        Self {
            updated_at: Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            strategies: table.sorted().into_iter().cloned().collect(),
        }
    }
}

/// Write the snapshot atomically: serialize to `<path>.tmp`, then rename
/// over the target, so a concurrent reader never observes a torn file.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    let tmp = tmp_path(path);
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}

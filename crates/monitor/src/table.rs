use std::collections::HashMap;

use common::{StatusKey, StrategyStatus};

/// In-memory mapping from (name, instrument) to the last-known status.
///
/// The single source of truth behind the snapshot. Records are never
/// pruned; a permanently retired strategy keeps its last status until
/// process restart.
#[derive(Debug, Default)]
pub struct StatusTable {
    records: HashMap<StatusKey, StrategyStatus>,
}

impl StatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &StatusKey) -> Option<&StrategyStatus> {
        self.records.get(key)
    }

    /// Merge one incoming record. Returns true (and replaces the stored
    /// record) when the change is observable: no previous record for the
    /// key, or `enabled`, `connection`, or `instrument` differs.
    pub fn apply(&mut self, status: StrategyStatus) -> bool {
        let key = status.key();
        let changed = match self.records.get(&key) {
            None => true,
            Some(prev) => prev.differs_from(&status),
        };
        if changed {
            self.records.insert(key, status);
        }
        changed
    }

    /// Records sorted by (name, instrument), case-insensitively, for
    /// deterministic snapshot output.
    pub fn sorted(&self) -> Vec<&StrategyStatus> {
        let mut statuses: Vec<&StrategyStatus> = self.records.values().collect();
        statuses.sort_by_key(|s| (s.name.to_lowercase(), s.instrument.to_lowercase()));
        statuses
    }
}

use serde::{Deserialize, Serialize};

/// Key identifying one tracked strategy: (name, instrument-or-empty).
pub type StatusKey = (String, String);

/// Last-known enable/disable state of one strategy on one instrument,
/// reconstructed from the platform log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyStatus {
    /// Strategy identifier. Never empty once recorded.
    pub name: String,
    /// Traded symbol, optionally with a contract month/year suffix.
    /// Empty when the log line did not yield a valid instrument.
    pub instrument: String,
    pub enabled: bool,
    /// Broker/account connection label. May be empty.
    pub connection: String,
    /// Supplementary account label. Stored but not part of the change test.
    #[serde(default)]
    pub account: String,
}

impl StrategyStatus {
    pub fn key(&self) -> StatusKey {
        (self.name.clone(), self.instrument.clone())
    }

    /// True when the incoming record differs from `self` in an observable
    /// field. `account` is metadata only and deliberately excluded.
    pub fn differs_from(&self, other: &StrategyStatus) -> bool {
        self.enabled != other.enabled
            || self.connection != other.connection
            || self.instrument != other.instrument
    }
}

impl std::fmt::Display for StrategyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "name='{}', instrument='{}', enabled={}, connection='{}'",
            self.name, self.instrument, self.enabled, self.connection
        )
    }
}

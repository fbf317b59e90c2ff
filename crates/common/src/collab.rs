use async_trait::async_trait;

use crate::error::Result;
use crate::types::StrategyStatus;

/// Remote store collaborator. Receives every observable status change.
///
/// Implementations must be best-effort: bounded timeouts, no in-loop
/// retries. A failed publish is reported via `Err`, logged by the caller,
/// and never stalls log consumption.
#[async_trait]
pub trait ChangePublisher: Send + Sync {
    async fn publish(&self, status: &StrategyStatus) -> Result<()>;
}

/// Notification collaborator (email). Receives a subject/body pair on
/// rate-limited change notification; owns its own transport configuration.
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str) -> Result<()>;
}

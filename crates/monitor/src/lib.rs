pub mod monitor;
pub mod snapshot;
pub mod table;

pub use monitor::StatusMonitor;
pub use snapshot::{write_snapshot, Snapshot};
pub use table::StatusTable;

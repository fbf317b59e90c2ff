pub const APP_NAME: &str = "NT8 Strategy Status Watcher";

pub mod collab;
pub mod config;
pub mod error;
pub mod types;

pub use collab::{ChangeNotifier, ChangePublisher};
pub use config::Config;
pub use error::{Error, Result};
pub use types::*;

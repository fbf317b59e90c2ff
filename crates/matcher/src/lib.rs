pub mod completer;
pub mod instrument;
pub mod matcher;
pub mod set;

pub use matcher::ParsedStatus;
pub use set::PatternSet;

use common::config::PatternsConfig;
use common::{Error, Result};
use regex::{Regex, RegexBuilder};

/// Compiled, ordered pattern lists. Built once at startup from config and
/// treated as read-only for the lifetime of the run.
///
/// All patterns are compiled case-insensitive and run against the raw line,
/// so captures keep the line's original casing.
#[derive(Debug)]
pub struct PatternSet {
    pub(crate) enabled: Vec<Regex>,
    pub(crate) disabled: Vec<Regex>,
    pub(crate) extract_name: Vec<Regex>,
    pub(crate) extract_instrument: Vec<Regex>,
    pub(crate) extract_connection: Vec<Regex>,
    pub(crate) extract_account: Vec<Regex>,
}

impl PatternSet {
    /// Compile the configured pattern lists. A malformed pattern is a
    /// startup error; nothing is compiled lazily later.
    pub fn compile(cfg: &PatternsConfig) -> Result<Self> {
        Ok(Self {
            enabled: compile_list(&cfg.enabled)?,
            disabled: compile_list(&cfg.disabled)?,
            extract_name: compile_list(&cfg.extractors.name)?,
            extract_instrument: compile_list(&cfg.extractors.instrument)?,
            extract_connection: compile_list(&cfg.extractors.connection)?,
            extract_account: compile_list(&cfg.extractors.account)?,
        })
    }
}

impl Default for PatternSet {
    /// The built-in pattern table.
    fn default() -> Self {
        Self::compile(&PatternsConfig::default()).expect("built-in patterns compile")
    }
}

fn compile_list(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(|e| Error::Pattern {
                    pattern: p.clone(),
                    message: e.to_string(),
                })
        })
        .collect()
}

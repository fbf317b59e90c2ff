use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// All configuration, loaded from a TOML file at startup.
///
/// Every field carries a serde default, so a partial (or absent) file is
/// deep-merged with the built-ins: the user's most specific values win and
/// anything omitted falls back to the defaults below.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub patterns: PatternsConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub supabase: SupabaseConfig,
}

impl Config {
    /// Load configuration from a TOML file. A missing file yields the full
    /// default config; an unreadable or malformed file exits the process
    /// with a clear message.
    pub fn load(path: &Path) -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        if !path.exists() {
            return Config::default();
        }
        let content = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Failed to read config at '{}': {e}", path.display()));
        toml::from_str(&content)
            .unwrap_or_else(|e| panic!("Failed to parse config at '{}': {e}", path.display()))
    }
}

/// Settings for the log watcher itself.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchConfig {
    /// Directory holding the platform's rotating log files.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Seconds to sleep when the tail has no new data.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: f64,
    /// Minimum minutes between change emails, measured from the last
    /// successful send.
    #[serde(default = "default_cooldown_min")]
    pub cooldown_min: u64,
    /// Optional allow-list: when non-empty, a line must contain at least one
    /// of these substrings (case-insensitive) to be considered.
    #[serde(default)]
    pub match_strategies: Vec<String>,
    /// Where the JSON snapshot is written (atomic replace).
    #[serde(default = "default_status_json_path")]
    pub status_json_path: PathBuf,
    #[serde(default)]
    pub email_on_change: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            poll_interval_secs: default_poll_interval(),
            cooldown_min: default_cooldown_min(),
            match_strategies: Vec::new(),
            status_json_path: default_status_json_path(),
            email_on_change: false,
        }
    }
}

fn default_log_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".into());
    PathBuf::from(home)
        .join("Documents")
        .join("NinjaTrader 8")
        .join("log")
}

fn default_poll_interval() -> f64 {
    1.0
}

fn default_cooldown_min() -> u64 {
    1
}

fn default_status_json_path() -> PathBuf {
    PathBuf::from("nt8_strategy_status.json")
}

/// SMTP delivery settings for change notifications.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    /// "starttls" (default) or "ssl" for implicit TLS.
    #[serde(default = "default_email_mode")]
    pub mode: String,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub from_addr: String,
    #[serde(default)]
    pub to_addrs: Vec<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            mode: default_email_mode(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from_addr: String::new(),
            to_addrs: Vec::new(),
        }
    }
}

fn default_email_mode() -> String {
    "starttls".into()
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".into()
}

fn default_smtp_port() -> u16 {
    587
}

/// Supabase REST target for per-change upserts.
///
/// The URL and keys may come from the environment instead of the file;
/// env always wins (`SUPABASE_URL`, `SUPABASE_SERVICE_ROLE_KEY`,
/// `SUPABASE_ANON_KEY`). Never ship the service role key to client code.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SupabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub service_role_key: String,
    #[serde(default)]
    pub anon_key: String,
    #[serde(default = "default_status_table")]
    pub table: String,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            service_role_key: String::new(),
            anon_key: String::new(),
            table: default_status_table(),
        }
    }
}

impl SupabaseConfig {
    pub fn resolved_url(&self) -> String {
        env_or("SUPABASE_URL", &self.url)
    }

    /// API key used for upserts: service role key if present, otherwise the
    /// anon key. Empty when neither is configured.
    pub fn resolved_key(&self) -> String {
        let service = env_or("SUPABASE_SERVICE_ROLE_KEY", &self.service_role_key);
        if !service.is_empty() {
            return service;
        }
        env_or("SUPABASE_ANON_KEY", &self.anon_key)
    }
}

fn default_status_table() -> String {
    "strategy_status".into()
}

fn env_or(env_name: &str, fallback: &str) -> String {
    match std::env::var(env_name) {
        Ok(v) if !v.is_empty() => v,
        _ => fallback.to_string(),
    }
}

/// Raw (uncompiled) pattern lists. Each category defaults independently, so
/// a config that overrides only `enabled` keeps the built-in `disabled` and
/// extractor tables.
///
/// Matching is case-insensitive against the raw line; captures keep the
/// line's original casing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PatternsConfig {
    #[serde(default = "default_enabled_patterns")]
    pub enabled: Vec<String>,
    #[serde(default = "default_disabled_patterns")]
    pub disabled: Vec<String>,
    #[serde(default)]
    pub extractors: ExtractorsConfig,
}

impl Default for PatternsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_patterns(),
            disabled: default_disabled_patterns(),
            extractors: ExtractorsConfig::default(),
        }
    }
}

/// Per-field fallback extractors, applied in order when a primary pattern
/// matched but left the field empty.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractorsConfig {
    #[serde(default = "default_name_extractors")]
    pub name: Vec<String>,
    #[serde(default = "default_instrument_extractors")]
    pub instrument: Vec<String>,
    #[serde(default = "default_connection_extractors")]
    pub connection: Vec<String>,
    #[serde(default = "default_account_extractors")]
    pub account: Vec<String>,
}

impl Default for ExtractorsConfig {
    fn default() -> Self {
        Self {
            name: default_name_extractors(),
            instrument: default_instrument_extractors(),
            connection: default_connection_extractors(),
            account: default_account_extractors(),
        }
    }
}

// Conservative, multi-shape patterns for typical NT8 log phrasing. Order is
// precedence: quoted-name forms first, bare fallbacks last. Each pattern
// should provide at least 'name'; 'instrument', 'connection' and 'account'
// are optional but preferred. Futures ("MNQ DEC25") and plain symbols
// ("AAPL") are both covered.

fn default_enabled_patterns() -> Vec<String> {
    vec![
        // Enabling NinjaScript strategy 'Foo/12345'
        r"\benabling\s+ninjascript\s+strategy\s+'(?P<name>[^']+)'".into(),
        // Strategy 'Foo' on MGC DEC25 enabled on connection My Funded 1
        r"strategy\s+'(?P<name>[^']+)'.*?\bon\b\s+(?P<instrument>[A-Z0-9]{1,6}(?:\s+[A-Z]{3}\d{2})?)\b.*?\benabled\b.*?(?:connection|account)\s+(?P<connection>[\w\s\-\.\#]+)".into(),
        // Enabled strategy 'Foo' for MNQ DEC25 via Sim101
        r"\benabled\b.*?strategy\s+'(?P<name>[^']+)'.*?\bfor\b\s+(?P<instrument>[A-Z0-9]{1,6}(?:\s+[A-Z]{3}\d{2})?)\b.*?(?:via|on|connection)\s+(?P<connection>[\w\s\-\.\#]+)".into(),
        // Strategy Foo enabled (name not quoted), grab instrument if present
        r"strategy\s+(?P<name>[A-Za-z0-9_\-\.]+).*?\benabled\b(?:.*?(?P<instrument>[A-Z0-9]{1,6}(?:\s+[A-Z]{3}\d{2})?))?(?:.*?(?:connection|via)\s+(?P<connection>[\w\s\-\.\#]+))?".into(),
    ]
}

fn default_disabled_patterns() -> Vec<String> {
    vec![
        // Disabling NinjaScript strategy 'Foo/12345'
        r"\bdisabling\s+ninjascript\s+strategy\s+'(?P<name>[^']+)'".into(),
        // Strategy 'Foo' on MGC DEC25 disabled on connection My Funded 1
        r"strategy\s+'(?P<name>[^']+)'.*?\bon\b\s+(?P<instrument>[A-Z0-9]{1,6}(?:\s+[A-Z]{3}\d{2})?)\b.*?\bdisabled\b.*?(?:connection|account)\s+(?P<connection>[\w\s\-\.\#]+)".into(),
        // Disabled strategy 'Foo' for MNQ DEC25 via Sim101
        r"\bdisabled\b.*?strategy\s+'(?P<name>[^']+)'.*?\bfor\b\s+(?P<instrument>[A-Z0-9]{1,6}(?:\s+[A-Z]{3}\d{2})?)\b.*?(?:via|on|connection)\s+(?P<connection>[\w\s\-\.\#]+)".into(),
        // Disabled strategy 'Foo'
        r"\bdisabled\b.*?strategy\s+'(?P<name>[^']+)'(?:.*?(?P<instrument>[A-Z0-9]{1,6}(?:\s+[A-Z]{3}\d{2})?))?(?:.*?(?:connection|via|on)\s+(?P<connection>[\w\s\-\.\#]+))?".into(),
        // Strategy Foo disabled (fallback)
        r"strategy\s+(?P<name>[A-Za-z0-9_\-\.]+).*?\bdisabled\b(?:.*?(?P<instrument>[A-Z0-9]{1,6}(?:\s+[A-Z]{3}\d{2})?))?(?:.*?(?:connection|via)\s+(?P<connection>[\w\s\-\.\#]+))?".into(),
    ]
}

fn default_name_extractors() -> Vec<String> {
    vec![
        r"strategy\s+'(?P<name>[^']+)'".into(),
        r"strategy\s+(?P<name>[A-Za-z0-9_\-\.]+)".into(),
    ]
}

fn default_instrument_extractors() -> Vec<String> {
    vec![
        // on <SYMBOL MMMYY> or on <SYMBOL MM-YY> or on <SYMBOL>
        r"\bon\s+(?P<instrument>[A-Z]{1,6}\s+(?:JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEP|OCT|NOV|DEC)\s?\d{2})\b".into(),
        r"\bon\s+(?P<instrument>[A-Z]{1,6}\s+\d{2}-\d{2})\b".into(),
        r"\bfor\s+(?P<instrument>[A-Z]{1,6}\s+(?:JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEP|OCT|NOV|DEC)\s?\d{2})\b".into(),
        r"\bfor\s+(?P<instrument>[A-Z]{1,6}\s+\d{2}-\d{2})\b".into(),
        // fallback: single symbol only when preceded by 'on' or 'for'
        r"\bon\s+(?P<instrument>[A-Z]{1,6})\b".into(),
        r"\bfor\s+(?P<instrument>[A-Z]{1,6})\b".into(),
    ]
}

fn default_connection_extractors() -> Vec<String> {
    vec![r"(?:connection|via)\s+(?P<connection>[\w\s\-\.\#]+)".into()]
}

fn default_account_extractors() -> Vec<String> {
    vec![r"(?:account)\s+(?P<account>[\w\s\-\.\#]+)".into()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_full_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.watch.poll_interval_secs, 1.0);
        assert_eq!(cfg.watch.cooldown_min, 1);
        assert!(!cfg.watch.email_on_change);
        assert_eq!(cfg.patterns.enabled.len(), 4);
        assert_eq!(cfg.patterns.disabled.len(), 5);
        assert_eq!(cfg.supabase.table, "strategy_status");
        assert_eq!(cfg.email.mode, "starttls");
    }

    #[test]
    fn partial_section_keeps_default_siblings() {
        // Overriding one pattern category must not wipe the others.
        let cfg: Config = toml::from_str(
            r#"
            [watch]
            poll_interval_secs = 0.25

            [patterns]
            enabled = ["custom\\s+(?P<name>\\w+)\\s+enabled"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.watch.poll_interval_secs, 0.25);
        assert_eq!(cfg.watch.cooldown_min, 1); // sibling default survives
        assert_eq!(cfg.patterns.enabled.len(), 1);
        assert_eq!(cfg.patterns.disabled.len(), 5);
        assert!(!cfg.patterns.extractors.instrument.is_empty());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(&dir.path().join("nope.toml"));
        assert_eq!(cfg.watch.poll_interval_secs, 1.0);
    }
}

use regex::{Captures, Regex};

use crate::set::PatternSet;

/// Partial parse of one log line. Empty string means the field was not
/// captured; the completer may still fill it from the fallback extractors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedStatus {
    pub enabled: bool,
    pub name: String,
    pub instrument: String,
    pub connection: String,
    pub account: String,
}

impl From<ParsedStatus> for common::StrategyStatus {
    fn from(parsed: ParsedStatus) -> Self {
        Self {
            name: parsed.name,
            instrument: parsed.instrument,
            enabled: parsed.enabled,
            connection: parsed.connection,
            account: parsed.account,
        }
    }
}

impl PatternSet {
    /// Classify a line as an enable/disable event.
    ///
    /// Enable patterns are tried in declared order, first match wins; then
    /// disable patterns in order. Declaration order is precedence: the
    /// strict quoted-name forms come before the loose bare forms, so a line
    /// satisfying both is always classified by the strict one. Returns
    /// `None` for the (common) case of a line that is not a status event.
    pub fn match_line(&self, line: &str) -> Option<ParsedStatus> {
        for re in &self.enabled {
            if let Some(caps) = re.captures(line) {
                return Some(parsed_from(true, re, &caps));
            }
        }
        for re in &self.disabled {
            if let Some(caps) = re.captures(line) {
                return Some(parsed_from(false, re, &caps));
            }
        }
        None
    }
}

fn parsed_from(enabled: bool, re: &Regex, caps: &Captures<'_>) -> ParsedStatus {
    let mut status = ParsedStatus {
        enabled,
        name: named_capture(re, caps, "name"),
        instrument: named_capture(re, caps, "instrument"),
        connection: named_capture(re, caps, "connection"),
        account: String::new(),
    };
    // Normalize names like 'Foo/12345' -> 'Foo' (trailing numeric ids)
    if let Some(idx) = status.name.find('/') {
        status.name.truncate(idx);
    }
    status
}

/// Capture a named group, tolerating patterns that do not declare it or
/// optional groups that did not participate in the match.
fn named_capture(re: &Regex, caps: &Captures<'_>, group: &str) -> String {
    if !re.capture_names().flatten().any(|n| n == group) {
        return String::new();
    }
    caps.name(group)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

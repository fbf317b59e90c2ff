//! Shape validation for extracted instrument tokens.
//!
//! The extractors are deliberately loose, so anything that reaches the
//! status record is checked against the three accepted shapes. Rejecting
//! here avoids false positives like bare years ("2025") leaking in as
//! instruments.

use std::sync::OnceLock;

use regex::Regex;

const MONTHS: &str = "JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEP|OCT|NOV|DEC";

fn fut_month_year() -> &'static Regex {
    // Futures, month-name form: "MNQ DEC25"
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"^[A-Z]{{1,6}}\s+(?:{MONTHS})\s?\d{{2}}$"))
            .expect("futures month-year shape is a valid regex")
    })
}

fn fut_numeric() -> &'static Regex {
    // Futures, numeric month-year form: "ES 03-26"
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Z]{1,6}\s+\d{2}-\d{2}$").expect("futures numeric shape is a valid regex")
    })
}

fn bare_symbol() -> &'static Regex {
    // Equities/forex symbol: "AAPL"
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]{1,6}$").expect("symbol shape is a valid regex"))
}

pub fn is_valid(token: &str) -> bool {
    fut_month_year().is_match(token) || fut_numeric().is_match(token) || bare_symbol().is_match(token)
}

/// Returns the token unchanged when it matches one of the accepted shapes,
/// otherwise the empty string. Total and idempotent.
pub fn validated(token: &str) -> &str {
    if is_valid(token) {
        token
    } else {
        ""
    }
}

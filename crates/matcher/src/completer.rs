use regex::Regex;

use crate::instrument;
use crate::matcher::ParsedStatus;
use crate::set::PatternSet;

/// Characters trimmed from both ends of every extracted field. The loose
/// capture classes tend to pick up trailing separators from the log line.
const SEPARATORS: &[char] = &[' ', ':', ';', ',', '-', '[', ']', '(', ')'];

impl PatternSet {
    /// Fill fields the primary match left empty, using the per-field
    /// fallback extractors in declared order.
    ///
    /// A non-empty primary capture is never overridden. After completion,
    /// stray separator punctuation is trimmed and the instrument is passed
    /// through shape validation; an invalid token is cleared to empty
    /// rather than kept as noise.
    pub fn complete(&self, line: &str, status: &mut ParsedStatus) {
        if status.name.is_empty() {
            status.name = first_capture(&self.extract_name, line, "name");
        }
        if status.instrument.is_empty() {
            status.instrument = first_capture(&self.extract_instrument, line, "instrument");
        }
        if status.connection.is_empty() {
            status.connection = first_capture(&self.extract_connection, line, "connection");
        }
        if status.account.is_empty() {
            status.account = first_capture(&self.extract_account, line, "account");
        }

        status.name = trim_separators(&status.name);
        status.instrument = trim_separators(&status.instrument);
        status.connection = trim_separators(&status.connection);
        status.account = trim_separators(&status.account);

        status.instrument = instrument::validated(&status.instrument).to_string();
    }
}

fn first_capture(extractors: &[Regex], line: &str, group: &str) -> String {
    for re in extractors {
        if let Some(m) = re.captures(line).and_then(|caps| caps.name(group)) {
            return m.as_str().trim().to_string();
        }
    }
    String::new()
}

fn trim_separators(value: &str) -> String {
    value.trim_matches(SEPARATORS).to_string()
}

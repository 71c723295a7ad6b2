//! Timestamp checks and formatting.
//!
//! The canonical document timestamp format is
//! `YYYY-MM-DDTHH:MM:SS[.mmm][Z]`. The parser and validator only check the
//! lexical pattern; [`is_calendar_valid`] additionally rejects strings that
//! match the pattern but name an impossible date (e.g. `2024-02-30`) and is
//! used where timestamps are produced rather than ingested.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

static TIMESTAMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d{3})?Z?$").unwrap());

/// Whether `value` matches the canonical timestamp pattern.
pub fn matches_format(value: &str) -> bool {
    TIMESTAMP_RE.is_match(value)
}

/// Whether `value` matches the pattern and names a real calendar date-time.
pub fn is_calendar_valid(value: &str) -> bool {
    if !matches_format(value) {
        return false;
    }
    let stripped = value.strip_suffix('Z').unwrap_or(value);
    NaiveDateTime::parse_from_str(stripped, "%Y-%m-%dT%H:%M:%S%.3f").is_ok()
        || NaiveDateTime::parse_from_str(stripped, "%Y-%m-%dT%H:%M:%S").is_ok()
}

/// Current UTC time in the canonical format (second precision, `Z` suffix).
pub fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

static EPOCH_MILLIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{12,13}$").expect("epoch pattern"));
static COMPACT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{14}$").expect("compact pattern"));

const TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parses the timestamp flavours found across test log exports.
/// Unknown formats yield `None`, the same as an empty cell.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if EPOCH_MILLIS.is_match(text) {
        let millis = text.parse::<i64>().ok()?;
        return DateTime::from_timestamp_millis(millis).map(|t| t.naive_utc());
    }
    if COMPACT.is_match(text) {
        return NaiveDateTime::parse_from_str(text, "%Y%m%d%H%M%S").ok();
    }
    for fmt in TIME_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(t);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Week label used when the operator does not give one, e.g. `W42`
pub fn week_label(tstamp: &NaiveDateTime) -> String {
    format!("W{:02}", tstamp.iso_week().week())
}

//! Kolab date handling
//!
//! Dates travel as `YYYY-MM-DD`, date-times always as UTC `YYYY-MM-DDTHH:MM:SSZ`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::value::Value;

/// Parse a `YYYY-MM-DD` token.
/// Anything else (including a valid token followed by other text) yields `None`
pub fn decode_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

/// Parse an ISO-8601 date-time and normalize it to UTC.
///
/// Accepts the canonical `Z` form (with or without fractional seconds), explicit offsets,
/// and zone-less values, which are taken as UTC.
pub fn decode_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive_text = text.strip_suffix('Z').unwrap_or(text);
    for format in &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(naive_text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// Decode either a date (exactly 10 characters long) or a date-time.
/// Unparsable text yields `Value::Null`
pub fn decode_date_or_datetime(text: &str) -> Value {
    if text.trim().len() == 10 {
        decode_date(text).map(Value::Date).unwrap_or(Value::Null)
    } else {
        decode_datetime(text).map(Value::DateTime).unwrap_or(Value::Null)
    }
}

pub fn encode_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Always a UTC value, with a mandatory `Z` suffix and whole seconds
pub fn encode_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> String {
    dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Turn a `YYYY-MM-DD` token into the compact `YYYYMMDD` form
pub fn compact_date(text: &str) -> Option<String> {
    let (year, month, day) = scan_date(text, '-')?;
    Some(format!("{:04}{:02}{:02}", year, month, day))
}

/// Turn a compact `YYYYMMDD` token back into `YYYY-MM-DD`
pub fn expand_date(text: &str) -> Option<String> {
    let text = text.trim();
    if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
        // Be gentle with callers that already hand over the long form
        return compact_date(text).and_then(|compact| expand_date(&compact));
    }
    let year: u32 = text[0..4].parse().ok()?;
    let month: u32 = text[4..6].parse().ok()?;
    let day: u32 = text[6..8].parse().ok()?;
    Some(format!("{:04}-{:02}-{:02}", year, month, day))
}

/// Read three numbers separated by `sep`, tolerating missing zero padding
fn scan_date(text: &str, sep: char) -> Option<(u32, u32, u32)> {
    let mut parts = text.trim().splitn(3, sep);
    let year = parts.next()?.trim().parse().ok()?;
    let month = parts.next()?.trim().parse().ok()?;
    let day = parts.next()?.trim().parse().ok()?;
    Some((year, month, day))
}

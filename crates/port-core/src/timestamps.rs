use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

pub const REGEX_ISO8601_FULL: &str = r"^(-?(?:[1-9][0-9]*)?[0-9]{4})-(1[0-2]|0[1-9])-(3[01]|0[1-9]|[12][0-9])T(2[0-3]|[01][0-9]):([0-5][0-9]):([0-5][0-9])(\.[0-9]+)?(Z|[+-](?:2[0-3]|[01][0-9]):[0-5][0-9])?$";
pub const REGEX_ISO8601_DATE: &str =
    r"^(-?(?:[1-9][0-9]*)?[0-9]{4})-(1[0-2]|0[1-9])-(3[01]|0[1-9]|[12][0-9])$";

/// 2000-01-01T00:00:00Z
pub const EPOCH_YEAR_2000: i64 = 946_684_800;
/// 2040-01-01T00:00:00Z
pub const EPOCH_YEAR_2040: i64 = 2_208_988_800;

static ISO8601_FULL: Lazy<Regex> =
    Lazy::new(|| Regex::new(REGEX_ISO8601_FULL).expect("ISO 8601 datetime pattern compiles"));
static ISO8601_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(REGEX_ISO8601_DATE).expect("ISO 8601 date pattern compiles"));

const MONTH_MAPPING: [(&str, &str); 3] = [("mrt", "mar"), ("mei", "may"), ("okt", "oct")];

/// A single cell value as it comes out of a DDP table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Integer(i64),
    Text(String),
}

impl RawValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RawValue::Integer(value) => Some(*value),
            RawValue::Text(text) => text.trim().parse::<i64>().ok(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RawValue::Text(text) if text.trim().is_empty())
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Integer(value) => write!(f, "{value}"),
            RawValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedTimestamp {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
    Date(NaiveDate),
}

impl ParsedTimestamp {
    /// Renders the timestamp as `YYYY-MM-DDTHH:MM:SS[.f][±HH:MM]`. Dates become midnight.
    pub fn to_iso8601(&self) -> String {
        match self {
            ParsedTimestamp::Zoned(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.f%:z").to_string(),
            ParsedTimestamp::Naive(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            ParsedTimestamp::Date(date) => date.format("%Y-%m-%dT00:00:00").to_string(),
        }
    }

    /// Naive values are taken to be UTC.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            ParsedTimestamp::Zoned(dt) => dt.with_timezone(&Utc),
            ParsedTimestamp::Naive(dt) => dt.and_utc(),
            ParsedTimestamp::Date(date) => date
                .and_hms_opt(0, 0, 0)
                .unwrap_or_default()
                .and_utc(),
        }
    }
}

/// Outcome of the lenient parser.
///
/// `Ambiguous` is the warning-level signal: the input only parsed after assuming
/// a day-first layout, so the value is usable but its interpretation is a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recognition {
    Matched(ParsedTimestamp),
    Ambiguous(ParsedTimestamp),
    NotMatched,
}

impl Recognition {
    pub fn timestamp(&self) -> Option<ParsedTimestamp> {
        match self {
            Recognition::Matched(ts) | Recognition::Ambiguous(ts) => Some(*ts),
            Recognition::NotMatched => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Layout {
    Zoned,
    AssumeUtc,
    Naive,
    Date,
}

static ZONED_AND_NAIVE_FORMATS: &[(&str, Layout)] = &[
    // JavaScript Date.toString() once the "(Zone Name)" suffix is gone
    ("%A %B %d %Y %H:%M:%S GMT%z", Layout::Zoned),
    ("%Y-%m-%d %H:%M:%S%.f %z", Layout::Zoned),
    ("%Y-%m-%dT%H:%M:%S%.f%z", Layout::Zoned),
    ("%Y-%m-%d %H:%M:%S%.f%z", Layout::Zoned),
    ("%d %B %Y %H:%M:%S %z", Layout::Zoned),
    ("%Y-%m-%d %H:%M:%S%.f UTC", Layout::AssumeUtc),
    ("%Y-%m-%dT%H:%M:%S%.f", Layout::Naive),
    ("%Y-%m-%d %H:%M:%S%.f", Layout::Naive),
    ("%Y-%m-%dT%H:%M", Layout::Naive),
    ("%Y-%m-%d %H:%M", Layout::Naive),
    ("%Y/%m/%d %H:%M:%S%.f", Layout::Naive),
    ("%Y/%m/%d %H:%M", Layout::Naive),
    ("%A %B %d %H:%M:%S %Y", Layout::Naive),
    ("%A %B %d %Y %H:%M:%S", Layout::Naive),
    ("%d %B %Y %H:%M:%S", Layout::Naive),
    ("%d %B %Y %H:%M", Layout::Naive),
    ("%B %d %Y %H:%M:%S", Layout::Naive),
    ("%B %d, %Y %H:%M:%S", Layout::Naive),
    ("%B %d, %Y, %I:%M %p", Layout::Naive),
    ("%B %d, %Y %I:%M %p", Layout::Naive),
    ("%B %d, %Y %I:%M:%S %p", Layout::Naive),
    ("%d %B %Y, %H:%M", Layout::Naive),
    ("%Y-%m-%d", Layout::Date),
    ("%Y/%m/%d", Layout::Date),
    ("%d %B %Y", Layout::Date),
    ("%B %d %Y", Layout::Date),
    ("%B %d, %Y", Layout::Date),
    ("%A, %B %d, %Y", Layout::Date),
];

static MONTH_FIRST_FORMATS: &[(&str, Layout)] = &[
    ("%m/%d/%Y %H:%M:%S", Layout::Naive),
    ("%m/%d/%Y %H:%M", Layout::Naive),
    ("%m/%d/%Y %I:%M:%S %p", Layout::Naive),
    ("%m/%d/%Y %I:%M %p", Layout::Naive),
    ("%m/%d/%Y", Layout::Date),
    ("%m-%d-%Y", Layout::Date),
    ("%m.%d.%Y", Layout::Date),
    ("%m/%d/%y", Layout::Date),
];

static DAY_FIRST_FORMATS: &[(&str, Layout)] = &[
    ("%d/%m/%Y %H:%M:%S", Layout::Naive),
    ("%d/%m/%Y %H:%M", Layout::Naive),
    ("%d/%m/%Y", Layout::Date),
    ("%d-%m-%Y %H:%M:%S", Layout::Naive),
    ("%d-%m-%Y %H:%M", Layout::Naive),
    ("%d-%m-%Y", Layout::Date),
    ("%d.%m.%Y %H:%M:%S", Layout::Naive),
    ("%d.%m.%Y %H:%M", Layout::Naive),
    ("%d.%m.%Y", Layout::Date),
    ("%d/%m/%y", Layout::Date),
];

fn try_layouts(input: &str, formats: &[(&str, Layout)]) -> Option<ParsedTimestamp> {
    for (fmt, layout) in formats {
        let parsed = match layout {
            Layout::Zoned => DateTime::parse_from_str(input, fmt)
                .ok()
                .map(ParsedTimestamp::Zoned),
            Layout::AssumeUtc => NaiveDateTime::parse_from_str(input, fmt)
                .ok()
                .map(|dt| ParsedTimestamp::Zoned(dt.and_utc().fixed_offset())),
            Layout::Naive => NaiveDateTime::parse_from_str(input, fmt)
                .ok()
                .map(ParsedTimestamp::Naive),
            Layout::Date => NaiveDate::parse_from_str(input, fmt)
                .ok()
                .map(ParsedTimestamp::Date),
        };
        if parsed.is_some() {
            return parsed;
        }
    }
    None
}

/// General purpose date/time recognition with a month-before-day bias.
pub fn parse_lenient(input: &str) -> Recognition {
    let normalized = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return Recognition::NotMatched;
    }

    if let Some(dt) = parse_iso8601(&normalized) {
        return Recognition::Matched(ParsedTimestamp::Zoned(dt));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(&normalized) {
        return Recognition::Matched(ParsedTimestamp::Zoned(dt));
    }
    if let Some(ts) = try_layouts(&normalized, ZONED_AND_NAIVE_FORMATS) {
        return Recognition::Matched(ts);
    }
    if let Some(ts) = try_layouts(&normalized, MONTH_FIRST_FORMATS) {
        return Recognition::Matched(ts);
    }
    if let Some(ts) = try_layouts(&normalized, DAY_FIRST_FORMATS) {
        return Recognition::Ambiguous(ts);
    }

    Recognition::NotMatched
}

/// Strict ISO 8601 parsing, accepting either `T` or a space between date and time.
pub fn parse_iso8601(value: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().fixed_offset())
}

/// Detects whether a string is a timestamp.
///
/// Digit-only strings are rejected outright so numeric identifiers are never
/// mistaken for dates, and anything the parser can only read ambiguously counts
/// as not a timestamp.
pub fn looks_like_timestamp(input: &str) -> bool {
    if input.is_empty() || input.chars().all(|c| c.is_ascii_digit()) {
        debug!("Timestamp NOT found in: '{}'", input);
        return false;
    }

    match parse_lenient(input) {
        Recognition::Matched(_) => {
            debug!("timestamp FOUND in: '{}'", input);
            true
        }
        Recognition::Ambiguous(_) => {
            warn!("ambiguous date format, probably NO timestamp in: '{}'", input);
            false
        }
        Recognition::NotMatched => {
            debug!("Timestamp NOT found in: '{}'", input);
            false
        }
    }
}

/// Checks whether the first `sample_size` values are ISO 8601 strings.
/// With `date_only` the date form (`YYYY-MM-DD`) is expected instead.
pub fn looks_like_iso8601(values: &[RawValue], sample_size: usize, date_only: bool) -> bool {
    let regex = if date_only { &*ISO8601_DATE } else { &*ISO8601_FULL };

    for value in values.iter().take(sample_size) {
        let matched = match value {
            RawValue::Integer(_) => false,
            RawValue::Text(text) => regex.is_match(text),
        };
        if !matched {
            debug!(
                "Could not detect ISO 8601 timestamp (date_only={}): {}",
                date_only, value
            );
            return false;
        }
    }

    debug!("ISO 8601 timestamp detected (date_only={})", date_only);
    true
}

/// Checks whether the first `sample_size` values are epoch seconds between the
/// start of 2000 and the start of 2040.
pub fn looks_like_epoch(values: &[RawValue], sample_size: usize) -> bool {
    for value in values.iter().take(sample_size) {
        let Some(seconds) = value.as_integer() else {
            debug!("Could not detect epoch time timestamp, not an integer: {}", value);
            return false;
        };
        if !(EPOCH_YEAR_2000..=EPOCH_YEAR_2040).contains(&seconds) {
            debug!("Could not detect epoch time timestamp: {}", seconds);
            return false;
        }
    }

    debug!("Epoch timestamp detected");
    true
}

/// Converts epoch seconds to an ISO 8601 string in UTC. Values that cannot be
/// converted are echoed back unchanged.
pub fn epoch_to_iso(value: &RawValue) -> String {
    let original = value.to_string();
    let Some(seconds) = value.as_integer() else {
        error!("Could not convert epoch time timestamp, not an integer: {}", original);
        return original;
    };

    match DateTime::from_timestamp(seconds, 0) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, false),
        None => {
            error!("Could not convert epoch time timestamp, out of range: {}", seconds);
            original
        }
    }
}

pub fn replace_months(input: &str) -> String {
    for (dutch, english) in MONTH_MAPPING {
        if input.contains(dutch) {
            return input.replacen(dutch, english, 1);
        }
    }
    input.to_string()
}

/// Last-resort conversion of any timestamp-like string to ISO 8601.
///
/// Ambiguous numeric dates are read month first. Returns an empty string when
/// nothing could be parsed.
pub fn best_effort_to_iso8601(raw: &str) -> String {
    let replaced = replace_months(raw);
    match parse_lenient(&replaced).timestamp() {
        Some(ts) => ts.to_iso8601(),
        None => {
            debug!("Could not convert '{}' to ISO 8601", raw);
            String::new()
        }
    }
}

/// Sort key putting the newest timestamps first and empty or unparseable
/// values last when sorted ascending.
pub fn sort_key_timestamp_empty_last(value: &str) -> f64 {
    match parse_iso8601(value) {
        Some(dt) => -(dt.timestamp_micros() as f64 / 1_000_000.0),
        None => {
            if !value.is_empty() {
                debug!("Cannot convert timestamp for sorting: '{}'", value);
            }
            f64::INFINITY
        }
    }
}

/// Normalizes a whole column of timestamps, choosing the conversion by sampling
/// the non-empty values: epoch seconds, already-ISO strings, or best effort.
pub fn normalize_timestamps(values: &[RawValue], sample_size: usize) -> Vec<String> {
    let present: Vec<RawValue> = values.iter().filter(|v| !v.is_empty()).cloned().collect();

    let convert: fn(&RawValue) -> String = if looks_like_epoch(&present, sample_size) {
        epoch_to_iso
    } else if looks_like_iso8601(&present, sample_size, false)
        || looks_like_iso8601(&present, sample_size, true)
    {
        RawValue::to_string
    } else {
        |value: &RawValue| best_effort_to_iso8601(&value.to_string())
    };

    values
        .iter()
        .map(|value| {
            if value.is_empty() {
                String::new()
            } else {
                convert(value)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_first_dates_are_flagged_ambiguous() {
        assert!(matches!(parse_lenient("25/12/2023"), Recognition::Ambiguous(_)));
        assert!(matches!(parse_lenient("12/25/2023"), Recognition::Matched(_)));
    }

    #[test]
    fn javascript_date_strings_keep_their_offset() {
        let parsed = parse_lenient("Thu Aug 10 2023 13:13:35 GMT+0200")
            .timestamp()
            .expect("parsed");
        assert_eq!(parsed.to_iso8601(), "2023-08-10T13:13:35+02:00");
    }

    #[test]
    fn whitespace_is_collapsed_before_parsing() {
        assert!(matches!(
            parse_lenient("  March   5,  2024 "),
            Recognition::Matched(ParsedTimestamp::Date(_))
        ));
    }
}

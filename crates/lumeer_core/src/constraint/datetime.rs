//! Date-time parsing, formatting and day-boundary helpers.
//!
//! Formats are stored in moment-style tokens (`DD.MM.YYYY HH:mm`) and
//! translated to chrono patterns on use. All computations run on naive UTC
//! date-times.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt::Write;

/// Format of date-time constraints without explicit configuration.
pub const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DD";
/// Moment-style format of interval bounds handed to the chart widget.
pub const GANTT_DATE_FORMAT: &str = "YYYY-MM-DD HH:mm";
/// Chrono pattern equivalent of [`GANTT_DATE_FORMAT`].
pub const GANTT_DATE_PATTERN: &str = "%Y-%m-%d %H:%M";

/// Years outside this open interval are treated as garbage input.
const MIN_VALID_YEAR: i32 = 1970;
const MAX_VALID_YEAR: i32 = 2200;

const ISO_DATE_TIME_PATTERNS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

static FORMAT_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\[[^\]]*\]|YYYY|YY|MMMM|MMM|MM|M|DD|D|dddd|ddd|HH|H|hh|h|mm|m|ss|s|SSS|A|a|(?s:.)",
    )
    .expect("valid date format token regex")
});
static FORMAT_LITERAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]").expect("valid date format literal regex"));

/// Translates a moment-style format into a chrono strftime pattern.
pub fn to_chrono_pattern(format: &str) -> String {
    let mut pattern = String::with_capacity(format.len() * 2);
    for token in FORMAT_TOKEN_RE.find_iter(format) {
        let token = token.as_str();
        let translated = match token {
            "YYYY" => "%Y",
            "YY" => "%y",
            "MMMM" => "%B",
            "MMM" => "%b",
            "MM" => "%m",
            "M" => "%-m",
            "DD" => "%d",
            "D" => "%-d",
            "dddd" => "%A",
            "ddd" => "%a",
            "HH" => "%H",
            "H" => "%-H",
            "hh" => "%I",
            "h" => "%-I",
            "mm" => "%M",
            "m" => "%-M",
            "ss" => "%S",
            "s" => "%-S",
            "SSS" => "%3f",
            "A" => "%p",
            "a" => "%P",
            literal => {
                let literal = literal
                    .strip_prefix('[')
                    .and_then(|inner| inner.strip_suffix(']'))
                    .unwrap_or(literal);
                pattern.push_str(&literal.replace('%', "%%"));
                continue;
            }
        };
        pattern.push_str(translated);
    }
    pattern
}

/// Returns whether a moment-style format carries hour precision.
pub fn format_has_hours(format: &str) -> bool {
    FORMAT_LITERAL_RE
        .replace_all(format, "")
        .chars()
        .any(|ch| matches!(ch, 'H' | 'h' | 'k'))
}

/// Parses a raw value into a naive UTC date-time.
///
/// Accepts epoch milliseconds, RFC 3339 and ISO strings, and strings written
/// in `format` when given.
pub fn parse_date_time(value: &Value, format: Option<&str>) -> Option<NaiveDateTime> {
    match value {
        Value::Number(number) => {
            let millis = number.as_f64()?;
            if !millis.is_finite() {
                return None;
            }
            DateTime::<Utc>::from_timestamp_millis(millis.round() as i64)
                .map(|date_time| date_time.naive_utc())
        }
        Value::String(text) => parse_date_time_str(text.trim(), format),
        _ => None,
    }
}

fn parse_date_time_str(text: &str, format: Option<&str>) -> Option<NaiveDateTime> {
    if text.is_empty() {
        return None;
    }
    if let Ok(date_time) = DateTime::parse_from_rfc3339(text) {
        return Some(date_time.naive_utc());
    }
    for pattern in ISO_DATE_TIME_PATTERNS {
        if let Ok(date_time) = NaiveDateTime::parse_from_str(text, pattern) {
            return Some(date_time);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }

    let pattern = to_chrono_pattern(format?);
    NaiveDateTime::parse_from_str(text, &pattern)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, &pattern)
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

/// Formats a date-time with a moment-style format.
///
/// Falls back to the chart pattern when the format cannot be rendered.
pub fn format_date_time(date_time: NaiveDateTime, format: &str) -> String {
    let pattern = to_chrono_pattern(format);
    let items: Vec<Item<'_>> = StrftimeItems::new(&pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return format_gantt_date(date_time);
    }
    let mut rendered = String::new();
    if write!(rendered, "{}", date_time.format_with_items(items.iter())).is_err() {
        return format_gantt_date(date_time);
    }
    rendered
}

/// Formats an interval bound for the chart widget.
pub fn format_gantt_date(date_time: NaiveDateTime) -> String {
    date_time.format(GANTT_DATE_PATTERN).to_string()
}

/// Storage form of date-time values.
pub fn to_iso_string(date_time: NaiveDateTime) -> String {
    date_time
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn start_of_day(date_time: NaiveDateTime) -> NaiveDateTime {
    date_time.date().and_time(NaiveTime::MIN)
}

/// Midnight after `date_time`, or `None` past the last representable day.
pub fn start_of_next_day(date_time: NaiveDateTime) -> Option<NaiveDateTime> {
    start_of_day(date_time).checked_add_signed(Duration::days(1))
}

/// Last millisecond of the day of `date_time`.
pub fn end_of_day(date_time: NaiveDateTime) -> Option<NaiveDateTime> {
    start_of_next_day(date_time)?.checked_sub_signed(Duration::milliseconds(1))
}

/// Returns whether the year lies strictly between 1970 and 2200.
pub fn is_in_valid_range(date_time: NaiveDateTime) -> bool {
    let year = date_time.year();
    year > MIN_VALID_YEAR && year < MAX_VALID_YEAR
}

pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

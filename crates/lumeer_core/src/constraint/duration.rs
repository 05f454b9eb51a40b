//! Duration values: milliseconds in storage, `1w 2d 3h` on screen.

use super::{DurationConstraintConfig, DurationType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const SECOND_MS: i64 = 1_000;
const MINUTE_MS: i64 = 60 * SECOND_MS;
const HOUR_MS: i64 = 60 * MINUTE_MS;

static DURATION_PART_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*([wdhms])").expect("valid duration part regex")
});

/// Length of one unit in milliseconds.
pub fn unit_millis(unit: char, kind: DurationType) -> i64 {
    let day = match kind {
        DurationType::Classic => 24 * HOUR_MS,
        DurationType::Work => 8 * HOUR_MS,
    };
    match unit.to_ascii_lowercase() {
        'w' => match kind {
            DurationType::Classic => 7 * day,
            DurationType::Work => 5 * day,
        },
        'd' => day,
        'h' => HOUR_MS,
        'm' => MINUTE_MS,
        _ => SECOND_MS,
    }
}

/// Parses a duration into milliseconds.
///
/// Numbers (and numeric strings) are already milliseconds; unit strings such
/// as `2d 4h` are converted with the configured day and week lengths.
pub fn parse_duration_millis(value: &Value, config: &DurationConstraintConfig) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|millis| millis.is_finite()),
        Value::String(text) => parse_duration_str(text.trim(), config.kind),
        _ => None,
    }
}

fn parse_duration_str(text: &str, kind: DurationType) -> Option<f64> {
    if text.is_empty() {
        return None;
    }
    if let Ok(millis) = text.parse::<f64>() {
        return millis.is_finite().then_some(millis);
    }

    let mut total = 0.0;
    let mut matched = 0;
    for captures in DURATION_PART_RE.captures_iter(text) {
        let amount = captures[1].replace(',', ".").parse::<f64>().ok()?;
        let unit = captures[2].chars().next()?;
        total += amount * unit_millis(unit, kind) as f64;
        matched += 1;
    }
    let leftover = DURATION_PART_RE.replace_all(text, "");
    if matched == 0 || !leftover.trim().is_empty() {
        return None;
    }
    Some(total)
}

/// Formats milliseconds as space-separated units, largest first.
pub fn format_duration(millis: f64, config: &DurationConstraintConfig) -> String {
    let mut remaining = millis.round().abs() as i64;
    let mut parts = Vec::new();
    for unit in ['w', 'd', 'h', 'm', 's'] {
        let size = unit_millis(unit, config.kind);
        let count = remaining / size;
        if count > 0 {
            parts.push(format!("{count}{unit}"));
            remaining %= size;
        }
    }
    if parts.is_empty() {
        return "0".to_string();
    }
    let formatted = parts.join(" ");
    if millis < 0.0 {
        format!("-{formatted}")
    } else {
        formatted
    }
}

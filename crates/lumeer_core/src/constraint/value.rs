//! Per-constraint value semantics.

use super::datetime::{format_date_time, parse_date_time, to_iso_string};
use super::duration::{format_duration, parse_duration_millis};
use super::{Constraint, ConstraintData, SelectConstraintConfig, SelectOption};
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Largest integer an `f64` represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Comparable projection of a value.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Number(f64),
    Text(String),
}

impl SortKey {
    /// Total order: numbers before text.
    pub fn compare(first: &SortKey, second: &SortKey) -> Ordering {
        match (first, second) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
        }
    }
}

impl Constraint {
    /// Normalizes a raw value into its storage form.
    pub fn serialize_value(&self, value: &Value, _data: &ConstraintData) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        match self {
            Self::Unknown | Self::Text | Self::Color => value.clone(),
            Self::Number(_) => parse_number(value).map_or_else(|| value.clone(), number_value),
            Self::Percentage(_) => {
                parse_percentage(value).map_or_else(|| value.clone(), number_value)
            }
            Self::Select(config) => {
                let values: Vec<Value> = expand(value)
                    .into_iter()
                    .filter_map(value_to_text)
                    .map(|text| {
                        Value::String(
                            find_option(config, &text)
                                .map_or(text, |option| option.value.clone()),
                        )
                    })
                    .collect();
                collapse(values, config.multi)
            }
            Self::DateTime(config) => parse_date_time(value, Some(&config.format))
                .map_or_else(|| value.clone(), |date_time| Value::String(to_iso_string(date_time))),
            Self::Duration(config) => {
                parse_duration_millis(value, config).map_or_else(|| value.clone(), number_value)
            }
            Self::User(config) => {
                let values: Vec<Value> = expand(value)
                    .into_iter()
                    .filter_map(value_to_text)
                    .map(|email| Value::String(email.trim().to_string()))
                    .collect();
                collapse(values, config.multi)
            }
            Self::Boolean => Value::Bool(is_checked(value)),
        }
    }

    /// Human readable rendering of a value.
    pub fn format_value(&self, value: &Value, data: &ConstraintData) -> String {
        if value.is_null() {
            return String::new();
        }
        match self {
            Self::Unknown | Self::Text | Self::Color => value_to_text(value).unwrap_or_default(),
            Self::Number(config) => parse_number(value)
                .map(|number| format_number(number, config.decimals))
                .or_else(|| value_to_text(value))
                .unwrap_or_default(),
            Self::Percentage(config) => parse_percentage(value)
                .map(|fraction| format!("{}%", format_number(fraction * 100.0, config.decimals)))
                .or_else(|| value_to_text(value))
                .unwrap_or_default(),
            Self::Select(config) => expand(value)
                .into_iter()
                .filter_map(value_to_text)
                .map(|text| match find_option(config, &text) {
                    Some(option) if config.display_values => option
                        .display_value
                        .clone()
                        .filter(|display| !display.is_empty())
                        .unwrap_or_else(|| option.value.clone()),
                    Some(option) => option.value.clone(),
                    None => text,
                })
                .collect::<Vec<_>>()
                .join(", "),
            Self::DateTime(config) => parse_date_time(value, Some(&config.format))
                .map(|date_time| format_date_time(date_time, &config.format))
                .or_else(|| value_to_text(value))
                .unwrap_or_default(),
            Self::Duration(config) => parse_duration_millis(value, config)
                .map(|millis| format_duration(millis, config))
                .or_else(|| value_to_text(value))
                .unwrap_or_default(),
            Self::User(_) => expand(value)
                .into_iter()
                .filter_map(value_to_text)
                .map(|email| {
                    data.find_user(&email)
                        .and_then(|user| user.name.clone())
                        .filter(|name| !name.trim().is_empty())
                        .unwrap_or_else(|| email.trim().to_string())
                })
                .collect::<Vec<_>>()
                .join(", "),
            Self::Boolean => is_checked(value).to_string(),
        }
    }

    /// Like [`Constraint::format_value`], but text keeps its markup.
    pub fn preview_value(&self, value: &Value, data: &ConstraintData) -> String {
        match self {
            Self::Text => value_to_text(value).unwrap_or_default(),
            _ => self.format_value(value, data),
        }
    }

    /// Returns whether a value conforms to the constraint. Empty values are valid.
    pub fn is_valid_value(&self, value: &Value, data: &ConstraintData) -> bool {
        if is_empty(value) {
            return true;
        }
        match self {
            Self::Select(config) => expand(value)
                .into_iter()
                .filter_map(value_to_text)
                .all(|text| find_option(config, &text).is_some()),
            Self::Number(_) => parse_number(value).is_some(),
            Self::Percentage(_) => parse_percentage(value).is_some(),
            Self::DateTime(config) => parse_date_time(value, Some(&config.format)).is_some(),
            Self::Duration(config) => parse_duration_millis(value, config).is_some(),
            Self::User(_) => {
                data.users.is_empty()
                    || expand(value)
                        .into_iter()
                        .filter_map(value_to_text)
                        .all(|email| data.find_user(&email).is_some())
            }
            Self::Unknown | Self::Text | Self::Color | Self::Boolean => true,
        }
    }

    /// Numeric meaning of a value, used for aggregation and sorting.
    ///
    /// Date-times map to epoch milliseconds, durations to milliseconds and
    /// percentages to fractions.
    pub fn numeric_value(&self, value: &Value) -> Option<f64> {
        match self {
            Self::Percentage(_) => parse_percentage(value),
            Self::Duration(config) => parse_duration_millis(value, config),
            Self::DateTime(config) => parse_date_time(value, Some(&config.format))
                .map(|date_time| date_time.and_utc().timestamp_millis() as f64),
            Self::Boolean => Some(if is_checked(value) { 1.0 } else { 0.0 }),
            Self::User(_) => None,
            Self::Unknown | Self::Text | Self::Number(_) | Self::Select(_) | Self::Color => {
                parse_number(value)
            }
        }
    }

    /// Comparable projection of a value; `None` for empty values.
    pub fn sort_key(&self, value: &Value, data: &ConstraintData) -> Option<SortKey> {
        if is_empty(value) {
            return None;
        }
        let text_key = || SortKey::Text(self.format_value(value, data).to_lowercase());
        match self {
            Self::Select(config) => {
                let first = expand(value).into_iter().find_map(value_to_text);
                let index = first.as_deref().and_then(|text| {
                    config
                        .options
                        .iter()
                        .position(|option| option.value == text)
                });
                Some(index.map_or_else(text_key, |index| SortKey::Number(index as f64)))
            }
            Self::Number(_)
            | Self::Percentage(_)
            | Self::Duration(_)
            | Self::DateTime(_)
            | Self::Boolean => Some(
                self.numeric_value(value)
                    .map_or_else(text_key, SortKey::Number),
            ),
            Self::Unknown | Self::Text | Self::User(_) | Self::Color => Some(text_key()),
        }
    }

    /// Select options matched by a value; empty for other constraints.
    pub fn matching_options(&self, value: &Value) -> Vec<&SelectOption> {
        let Self::Select(config) = self else {
            return Vec::new();
        };
        expand(value)
            .into_iter()
            .filter_map(value_to_text)
            .filter_map(|text| find_option(config, &text))
            .collect()
    }
}

fn find_option<'a>(config: &'a SelectConstraintConfig, text: &str) -> Option<&'a SelectOption> {
    config
        .options
        .iter()
        .find(|option| option.value == text)
        .or_else(|| {
            config
                .options
                .iter()
                .find(|option| option.display_value.as_deref() == Some(text))
        })
}

fn collapse(mut values: Vec<Value>, multi: bool) -> Value {
    if multi {
        Value::Array(values)
    } else if values.is_empty() {
        Value::Null
    } else {
        values.swap_remove(0)
    }
}

/// Flattens arrays into their non-null items; scalars become one item.
pub(crate) fn expand(value: &Value) -> Vec<&Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().filter(|item| !item.is_null()).collect(),
        other => vec![other],
    }
}

/// Stringifies a scalar the way titles and labels display it.
pub(crate) fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(value_to_text)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

/// JavaScript-like truthiness: null, `""`, `0` and `false` are falsy.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|number| number != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.iter().all(is_empty),
        _ => false,
    }
}

fn is_checked(value: &Value) -> bool {
    match value {
        Value::String(text) => matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        ),
        other => is_truthy(other),
    }
}

pub(crate) fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let normalized = text.trim().replace(',', ".");
            if normalized.is_empty() {
                return None;
            }
            normalized.parse::<f64>().ok().filter(|number| number.is_finite())
        }
        _ => None,
    }
}

/// Percentages are stored as fractions; `"50%"` and `0.5` are equal.
fn parse_percentage(value: &Value) -> Option<f64> {
    if let Value::String(text) = value {
        if let Some(stripped) = text.trim().strip_suffix('%') {
            return parse_number(&Value::String(stripped.to_string())).map(|number| number / 100.0);
        }
    }
    parse_number(value)
}

/// Converts a float to a JSON number, preferring integers when exact.
pub(crate) fn number_value(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER {
        Value::from(number as i64)
    } else {
        Number::from_f64(number).map_or(Value::Null, Value::Number)
    }
}

/// Formats a number with fixed decimals, or trimmed when unconfigured.
pub(crate) fn format_number(number: f64, decimals: Option<u32>) -> String {
    match decimals {
        Some(decimals) => format!("{:.*}", decimals as usize, number),
        None => {
            let rounded = (number * 1e10).round() / 1e10;
            if rounded == 0.0 {
                "0".to_string()
            } else {
                rounded.to_string()
            }
        }
    }
}

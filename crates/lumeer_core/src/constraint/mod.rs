//! Typed value descriptors controlling parsing, formatting and validation.
//!
//! # Responsibility
//! - Describe attribute value types and their configuration.
//! - Normalize, format, validate and aggregate raw JSON values per type.
//!
//! # Invariants
//! - Value operations never fail: unparsable input degrades to a passthrough
//!   rendering instead of an error.
//! - A missing constraint behaves exactly like `Constraint::Unknown`.

pub mod aggregate;
pub mod datetime;
pub mod duration;
pub(crate) mod value;

pub use aggregate::{aggregate_data_values, format_aggregated_value, DataAggregationType};
pub use value::SortKey;

use serde::{Deserialize, Serialize};

/// Discriminant of [`Constraint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    Unknown,
    Text,
    Number,
    Percentage,
    Select,
    DateTime,
    Duration,
    User,
    Color,
    Boolean,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberConstraintConfig {
    #[serde(default)]
    pub decimals: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PercentageConstraintConfig {
    #[serde(default)]
    pub decimals: Option<u32>,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    #[serde(default)]
    pub display_value: Option<String>,
    /// Hex background shown behind the option.
    #[serde(default)]
    pub background: Option<String>,
}

impl SelectOption {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            display_value: None,
            background: None,
        }
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = Some(background.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectConstraintConfig {
    #[serde(default)]
    pub options: Vec<SelectOption>,
    #[serde(default)]
    pub multi: bool,
    /// Show `display_value` instead of `value` when formatting.
    #[serde(default)]
    pub display_values: bool,
}

impl SelectConstraintConfig {
    pub fn with_options<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            options: values.into_iter().map(SelectOption::new).collect(),
            multi: false,
            display_values: false,
        }
    }

    pub fn option_values(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|option| option.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateTimeConstraintConfig {
    /// Moment-style format, e.g. `DD.MM.YYYY HH:mm`.
    pub format: String,
}

impl Default for DateTimeConstraintConfig {
    fn default() -> Self {
        Self {
            format: datetime::DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl DateTimeConstraintConfig {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }
}

/// Length of a day and a week when converting duration units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationType {
    /// 24-hour days, 7-day weeks.
    #[default]
    Classic,
    /// 8-hour days, 5-day weeks.
    Work,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationConstraintConfig {
    #[serde(default, rename = "type")]
    pub kind: DurationType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConstraintConfig {
    #[serde(default)]
    pub multi: bool,
    /// Show only the avatar, without the user name.
    #[serde(default)]
    pub only_icon: bool,
}

/// Value-type descriptor of an attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum Constraint {
    /// Permissive passthrough used whenever the real constraint is unknown.
    #[default]
    Unknown,
    Text,
    Number(NumberConstraintConfig),
    Percentage(PercentageConstraintConfig),
    Select(SelectConstraintConfig),
    DateTime(DateTimeConstraintConfig),
    Duration(DurationConstraintConfig),
    User(UserConstraintConfig),
    Color,
    Boolean,
}

impl Constraint {
    pub fn constraint_type(&self) -> ConstraintType {
        match self {
            Self::Unknown => ConstraintType::Unknown,
            Self::Text => ConstraintType::Text,
            Self::Number(_) => ConstraintType::Number,
            Self::Percentage(_) => ConstraintType::Percentage,
            Self::Select(_) => ConstraintType::Select,
            Self::DateTime(_) => ConstraintType::DateTime,
            Self::Duration(_) => ConstraintType::Duration,
            Self::User(_) => ConstraintType::User,
            Self::Color => ConstraintType::Color,
            Self::Boolean => ConstraintType::Boolean,
        }
    }

    pub fn is_duration(&self) -> bool {
        matches!(self, Self::Duration(_))
    }

    /// Returns whether values carry hour precision (date-time formats with
    /// an hour token).
    pub fn contains_hours(&self) -> bool {
        match self {
            Self::DateTime(config) => datetime::format_has_hours(&config.format),
            _ => false,
        }
    }

    /// Returns whether a view may display this attribute through `other`.
    pub fn accepts_override(&self, other: &Constraint) -> bool {
        use ConstraintType as T;
        matches!(
            (self.constraint_type(), other.constraint_type()),
            (T::DateTime, T::DateTime)
                | (T::Duration, T::Duration)
                | (T::Select, T::Select)
                | (T::User, T::User)
                | (T::Number | T::Percentage, T::Number | T::Percentage)
                | (T::Text | T::Unknown, T::Number | T::Percentage | T::DateTime)
        )
    }
}

/// Resolves the constraint a view should use for an attribute.
///
/// A valid override wins; otherwise the attribute constraint, otherwise the
/// permissive unknown constraint.
pub fn resolve_constraint(
    attribute_constraint: Option<&Constraint>,
    override_constraint: Option<&Constraint>,
) -> Constraint {
    let base = attribute_constraint.cloned().unwrap_or_default();
    match override_constraint {
        Some(candidate) if base.accepts_override(candidate) => candidate.clone(),
        _ => base,
    }
}

/// Known workspace user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Ambient data some constraints need to format values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintData {
    /// Email of the signed-in user.
    #[serde(default)]
    pub current_user: Option<String>,
    #[serde(default)]
    pub users: Vec<User>,
}

impl ConstraintData {
    pub fn find_user(&self, email: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        resolve_constraint, Constraint, DateTimeConstraintConfig, NumberConstraintConfig,
        PercentageConstraintConfig, SelectConstraintConfig,
    };

    #[test]
    fn override_is_applied_only_for_compatible_types() {
        let number = Constraint::Number(NumberConstraintConfig::default());
        let percentage = Constraint::Percentage(PercentageConstraintConfig::default());
        let select = Constraint::Select(SelectConstraintConfig::default());

        assert_eq!(resolve_constraint(Some(&number), Some(&percentage)), percentage);
        assert_eq!(resolve_constraint(Some(&number), Some(&select)), number);
        assert_eq!(resolve_constraint(None, Some(&select)), Constraint::Unknown);
        assert_eq!(resolve_constraint(None, None), Constraint::Unknown);
    }

    #[test]
    fn contains_hours_reads_date_format() {
        let date = Constraint::DateTime(DateTimeConstraintConfig::new("DD.MM.YYYY"));
        let date_time = Constraint::DateTime(DateTimeConstraintConfig::new("DD.MM.YYYY HH:mm"));
        assert!(!date.contains_hours());
        assert!(date_time.contains_hours());
        assert!(!Constraint::Text.contains_hours());
    }

    #[test]
    fn serializes_with_type_tag() {
        let constraint = Constraint::Select(SelectConstraintConfig::with_options(["Done"]));
        let json = serde_json::to_value(&constraint).unwrap();
        assert_eq!(json["type"], "select");
        assert_eq!(json["config"]["options"][0]["value"], "Done");

        let text: Constraint = serde_json::from_value(serde_json::json!({"type": "text"})).unwrap();
        assert_eq!(text, Constraint::Text);
    }
}

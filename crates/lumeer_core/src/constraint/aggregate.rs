//! Reductions over attribute values (column summaries, task progress).

use super::value::{format_number, number_value};
use super::{Constraint, ConstraintData};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataAggregationType {
    #[default]
    Sum,
    Min,
    Max,
    Avg,
    Median,
    Count,
    Unique,
}

impl DataAggregationType {
    /// Count-like aggregations yield plain counts instead of values of the
    /// attribute's type.
    pub fn is_count(self) -> bool {
        matches!(self, Self::Count | Self::Unique)
    }
}

/// Aggregates values under a constraint.
///
/// Returns `None` when a numeric aggregation finds no numeric value.
pub fn aggregate_data_values(
    kind: DataAggregationType,
    values: &[Value],
    constraint: &Constraint,
    data: &ConstraintData,
) -> Option<f64> {
    let present = values.iter().filter(|value| !value.is_null());
    match kind {
        DataAggregationType::Count => Some(present.count() as f64),
        DataAggregationType::Unique => {
            let distinct: HashSet<String> = present
                .map(|value| constraint.serialize_value(value, data).to_string())
                .collect();
            Some(distinct.len() as f64)
        }
        _ => {
            let mut numbers: Vec<f64> = present
                .flat_map(|value| match value {
                    Value::Array(items) => items.iter().collect::<Vec<_>>(),
                    other => vec![other],
                })
                .filter_map(|value| constraint.numeric_value(value))
                .collect();
            if numbers.is_empty() {
                return None;
            }
            Some(reduce_numbers(kind, &mut numbers))
        }
    }
}

fn reduce_numbers(kind: DataAggregationType, numbers: &mut [f64]) -> f64 {
    match kind {
        DataAggregationType::Min => numbers.iter().copied().fold(f64::INFINITY, f64::min),
        DataAggregationType::Max => numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        DataAggregationType::Avg => numbers.iter().sum::<f64>() / numbers.len() as f64,
        DataAggregationType::Median => {
            numbers.sort_by(f64::total_cmp);
            let middle = numbers.len() / 2;
            if numbers.len() % 2 == 0 {
                (numbers[middle - 1] + numbers[middle]) / 2.0
            } else {
                numbers[middle]
            }
        }
        DataAggregationType::Sum | DataAggregationType::Count | DataAggregationType::Unique => {
            numbers.iter().sum()
        }
    }
}

/// Renders an aggregated value the way the attribute would display it.
pub fn format_aggregated_value(
    kind: DataAggregationType,
    value: Option<f64>,
    constraint: &Constraint,
    data: &ConstraintData,
) -> Option<String> {
    let value = value?;
    if kind.is_count() {
        return Some(format_number(value, None));
    }
    Some(constraint.format_value(&number_value(value), data))
}

#[cfg(test)]
mod tests {
    use super::{aggregate_data_values, format_aggregated_value, DataAggregationType};
    use crate::constraint::{
        Constraint, ConstraintData, DurationConstraintConfig, PercentageConstraintConfig,
        SelectConstraintConfig,
    };
    use serde_json::{json, Value};

    #[test]
    fn numeric_aggregations() {
        let data = ConstraintData::default();
        let values = vec![json!(4), json!("2"), Value::Null, json!(9)];
        let run = |kind| aggregate_data_values(kind, &values, &Constraint::Unknown, &data);

        assert_eq!(run(DataAggregationType::Sum), Some(15.0));
        assert_eq!(run(DataAggregationType::Min), Some(2.0));
        assert_eq!(run(DataAggregationType::Max), Some(9.0));
        assert_eq!(run(DataAggregationType::Avg), Some(5.0));
        assert_eq!(run(DataAggregationType::Median), Some(4.0));
        assert_eq!(run(DataAggregationType::Count), Some(3.0));
    }

    #[test]
    fn unique_counts_serialized_values() {
        let constraint = Constraint::Select(SelectConstraintConfig::with_options(["a", "b"]));
        let values = vec![json!("a"), json!("a"), json!("b")];
        assert_eq!(
            aggregate_data_values(
                DataAggregationType::Unique,
                &values,
                &constraint,
                &ConstraintData::default()
            ),
            Some(2.0)
        );
    }

    #[test]
    fn sum_without_numbers_is_none() {
        let values = vec![json!("x"), Value::Null];
        assert_eq!(
            aggregate_data_values(
                DataAggregationType::Sum,
                &values,
                &Constraint::Text,
                &ConstraintData::default()
            ),
            None
        );
    }

    #[test]
    fn formats_through_constraint() {
        let data = ConstraintData::default();
        let duration = Constraint::Duration(DurationConstraintConfig::default());
        assert_eq!(
            format_aggregated_value(
                DataAggregationType::Sum,
                Some(3_600_000.0),
                &duration,
                &data
            ),
            Some("1h".to_string())
        );
        let percentage = Constraint::Percentage(PercentageConstraintConfig::default());
        assert_eq!(
            format_aggregated_value(DataAggregationType::Count, Some(3.0), &percentage, &data),
            Some("3".to_string())
        );
    }
}

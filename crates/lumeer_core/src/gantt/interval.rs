//! Task intervals: validity, duration sides, inversion and day snapping.

use crate::constraint::datetime::{
    format_gantt_date, is_in_valid_range, parse_date_time, start_of_day, start_of_next_day,
};
use crate::constraint::duration::parse_duration_millis;
use crate::constraint::value::is_truthy;
use crate::constraint::Constraint;
use chrono::{Duration, NaiveDateTime};
use serde_json::Value;

/// Resolved interval of one task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInterval {
    /// `YYYY-MM-DD HH:mm`.
    pub start: String,
    pub start_raw: Value,
    pub start_constraint: Constraint,
    pub end: String,
    pub end_raw: Value,
    pub end_constraint: Constraint,
    pub swapped: bool,
}

fn date_format(constraint: &Constraint) -> Option<&str> {
    match constraint {
        Constraint::DateTime(config) => Some(config.format.as_str()),
        _ => None,
    }
}

fn parse_date(value: &Value, constraint: &Constraint) -> Option<NaiveDateTime> {
    parse_date_time(value, date_format(constraint))
}

fn is_date_in_valid_range(value: &Value, constraint: &Constraint) -> bool {
    parse_date(value, constraint).is_some_and(is_in_valid_range)
}

/// Returns whether a task with these bounds may be shown.
///
/// A duration side only needs a truthy value; the other side must be a date
/// in the supported year range.
pub fn is_task_valid(
    start: &Value,
    start_constraint: &Constraint,
    end: &Value,
    end_constraint: &Constraint,
) -> bool {
    if start_constraint.is_duration() {
        return is_truthy(start) && is_date_in_valid_range(end, end_constraint);
    }
    if end_constraint.is_duration() {
        return is_truthy(end) && is_date_in_valid_range(start, start_constraint);
    }
    is_date_in_valid_range(start, start_constraint) && is_date_in_valid_range(end, end_constraint)
}

fn duration_of(value: &Value, constraint: &Constraint) -> Option<Duration> {
    let Constraint::Duration(config) = constraint else {
        return None;
    };
    let millis = parse_duration_millis(value, config)?.round();
    if millis.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(millis as i64)
}

/// Computes the interval of a task.
///
/// A duration side is derived from the date side. Inverted bounds are
/// exchanged together with their raw values and constraints. Bounds without
/// hour precision snap to whole days; the end snaps to the following
/// midnight so that a one-day task spans one day. Bounds that leave the
/// representable date range yield `None`.
pub fn create_interval(
    start_raw: &Value,
    start_constraint: &Constraint,
    end_raw: &Value,
    end_constraint: &Constraint,
) -> Option<TaskInterval> {
    let (start, end) = if start_constraint.is_duration() {
        let end = parse_date(end_raw, end_constraint)?;
        (end.checked_sub_signed(duration_of(start_raw, start_constraint)?)?, end)
    } else if end_constraint.is_duration() {
        let start = parse_date(start_raw, start_constraint)?;
        (start, start.checked_add_signed(duration_of(end_raw, end_constraint)?)?)
    } else {
        (
            parse_date(start_raw, start_constraint)?,
            parse_date(end_raw, end_constraint)?,
        )
    };

    let swapped = end < start;
    let (mut start, mut end) = if swapped { (end, start) } else { (start, end) };
    let (start_raw, end_raw) = if swapped {
        (end_raw, start_raw)
    } else {
        (start_raw, end_raw)
    };
    let (start_constraint, end_constraint) = if swapped {
        (end_constraint, start_constraint)
    } else {
        (start_constraint, end_constraint)
    };

    let any_duration = start_constraint.is_duration() || end_constraint.is_duration();
    if !start_constraint.is_duration() && !start_constraint.contains_hours() {
        start = start_of_day(start);
    }
    if !any_duration && !end_constraint.contains_hours() {
        end = start_of_next_day(end)?;
    }

    Some(TaskInterval {
        start: format_gantt_date(start),
        start_raw: start_raw.clone(),
        start_constraint: start_constraint.clone(),
        end: format_gantt_date(end),
        end_raw: end_raw.clone(),
        end_constraint: end_constraint.clone(),
        swapped,
    })
}

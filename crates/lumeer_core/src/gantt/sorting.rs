//! Stable task order across conversions.
//!
//! # Invariants
//! - While the sort key is unchanged, known tasks keep their positions and
//!   new tasks are appended in conversion order.
//! - The order is only remembered from fully loaded data.

use crate::gantt::config::GanttChartStemConfig;
use crate::gantt::task::GanttTask;
use crate::model::query::{Query, QueryStem};
use crate::model::settings::{AttributeSortSetting, ViewSettings};
use std::collections::HashMap;

/// Everything that invalidates a remembered order when it changes.
#[derive(Debug, Clone, PartialEq)]
pub struct GanttTasksSortKey {
    pub stems: Vec<QueryStem>,
    pub sort: Vec<AttributeSortSetting>,
    pub stems_configs: Vec<GanttChartStemConfig>,
}

impl GanttTasksSortKey {
    pub fn new(query: &Query, settings: &ViewSettings, stems_configs: &[GanttChartStemConfig]) -> Self {
        Self {
            stems: query.stems.clone(),
            sort: settings.sort.clone(),
            stems_configs: stems_configs.to_vec(),
        }
    }
}

/// Remembered task order.
#[derive(Debug, Clone, PartialEq)]
pub struct GanttTasksSort {
    pub key: GanttTasksSortKey,
    positions: HashMap<String, usize>,
}

impl GanttTasksSort {
    fn from_tasks(key: GanttTasksSortKey, tasks: &[GanttTask]) -> Self {
        let positions = tasks
            .iter()
            .enumerate()
            .map(|(position, task)| (task.id.clone(), position))
            .collect();
        Self { key, positions }
    }

    pub fn position(&self, task_id: &str) -> Option<usize> {
        self.positions.get(task_id).copied()
    }
}

#[derive(Debug, Clone)]
pub struct SortedTasks {
    pub tasks: Vec<GanttTask>,
    pub sort: Option<GanttTasksSort>,
    pub sort_changed: bool,
}

/// Orders tasks and returns the order to remember.
pub fn sort_gantt_tasks(
    mut tasks: Vec<GanttTask>,
    previous: Option<&GanttTasksSort>,
    data_loaded: bool,
    key: GanttTasksSortKey,
) -> SortedTasks {
    let sort_changed = match previous {
        Some(previous) if previous.key == key => {
            tasks.sort_by_key(|task| previous.position(&task.id).unwrap_or(usize::MAX));
            false
        }
        _ => {
            // Records already arrive in view-settings order.
            if key.sort.is_empty() {
                tasks.sort_by(|a, b| {
                    a.start
                        .cmp(&b.start)
                        .then_with(|| a.end.cmp(&b.end))
                        .then_with(|| a.name.cmp(&b.name))
                        .then_with(|| a.id.cmp(&b.id))
                });
            }
            previous.is_some()
        }
    };

    let sort = if data_loaded {
        Some(GanttTasksSort::from_tasks(key, &tasks))
    } else {
        previous.cloned()
    };
    SortedTasks {
        tasks,
        sort,
        sort_changed,
    }
}

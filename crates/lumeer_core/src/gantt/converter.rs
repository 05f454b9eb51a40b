//! Gantt chart conversion.
//!
//! # Responsibility
//! - Turn the records of every query stem into chart tasks with intervals,
//!   progress, milestones, swimlanes and drag flags.
//! - Build widget options and keep the task order stable across calls.
//!
//! # Invariants
//! - Every emitted task has `start <= end`.
//! - Tasks with invalid bounds are excluded, never reported as errors.

use crate::aggregation::{DataObjectInfo, StemAggregator};
use crate::constraint::datetime::GANTT_DATE_FORMAT;
use crate::constraint::value::{expand, number_value, value_to_text};
use crate::constraint::{
    aggregate_data_values, Constraint, ConstraintData, ConstraintType, DataAggregationType,
    DateTimeConstraintConfig,
};
use crate::gantt::config::{
    GanttChartConfig, GanttChartStemConfig, COLOR_PRIMARY, GANTT_BAR_HEIGHT, GANTT_COLUMN_WIDTH,
    GANTT_FONT_SIZE, GANTT_PADDING,
};
use crate::gantt::interval::{create_interval, is_task_valid, TaskInterval};
use crate::gantt::sorting::{sort_gantt_tasks, GanttTasksSort, GanttTasksSortKey};
use crate::gantt::task::{
    GanttOptions, GanttSwimlane, GanttSwimlaneInfo, GanttSwimlaneType, GanttTask,
    GanttTaskMetadata, Milestone,
};
use crate::model::data_resource::DataResource;
use crate::model::input::PerspectiveInput;
use crate::model::query::{find_resource_by_query_resource, QueryAttribute};
use crate::model::resource::{resource_color, AttributesResourceType};
use crate::model::settings::sort_stem_data;
use crate::util::color::{contrast_color, shade_color};
use crate::util::text::{avatar_url, strip_html_tags, strip_trailing_percent};
use log::info;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;

const KEY_NAME: &str = "name";
const KEY_START: &str = "start";
const KEY_END: &str = "end";
const KEY_COLOR: &str = "color";
const KEY_PROGRESS: &str = "progress";

/// Result of one conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GanttConversion {
    pub options: GanttOptions,
    pub tasks: Vec<GanttTask>,
    /// The task order was recomputed because its inputs changed.
    pub sort_changed: bool,
}

/// Stateful converter scoped to one Gantt view.
pub struct GanttChartConverter {
    locale: String,
    is_first_conversion: bool,
    tasks_sort: Option<GanttTasksSort>,
}

/// Valid task candidate before presentation.
struct TaskDraft<'a> {
    info: DataObjectInfo<'a>,
    id: String,
    interval: TaskInterval,
    name: Option<&'a DataResource>,
    /// Bounds after a possible swap.
    start: Option<&'a DataResource>,
    end: Option<&'a DataResource>,
}

/// Derived data shared by all tasks of a stem.
#[derive(Default)]
struct StemTasksData {
    editable_task_ids: Vec<String>,
    parent_children: HashMap<String, Vec<String>>,
}

impl GanttChartConverter {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            is_first_conversion: true,
            tasks_sort: None,
        }
    }

    /// Converts the records of `input` into chart tasks.
    ///
    /// `data_loaded` tells whether `input` holds the complete data; only then
    /// is the resulting order remembered.
    pub fn convert(
        &mut self,
        config: &GanttChartConfig,
        input: &PerspectiveInput,
        data_loaded: bool,
    ) -> GanttConversion {
        let started_at = Instant::now();
        let maximum_swimlanes = config
            .stems_configs
            .iter()
            .map(|stem_config| stem_config.categories.len())
            .max()
            .unwrap_or(0);

        let mut tasks = Vec::new();
        for (index, stem) in input.query.stems.iter().enumerate() {
            let Some(stem_config) = config.stems_configs.get(index) else {
                continue;
            };
            if !stem_config.has_required_properties() {
                continue;
            }
            let stem_data = sort_stem_data(
                input.data.data_by_stems.get(index),
                &input.settings,
                &input.collections,
                &input.link_types,
                &input.constraint_data,
            );
            let aggregator = StemAggregator::new(input, stem, Some(&stem_data));
            tasks.extend(convert_stem(
                &aggregator,
                stem_config,
                index,
                maximum_swimlanes,
            ));
        }

        let options = self.create_options(config, input);
        let key = GanttTasksSortKey::new(&input.query, &input.settings, &config.stems_configs);
        let sorted = sort_gantt_tasks(tasks, self.tasks_sort.as_ref(), data_loaded, key);
        self.tasks_sort = sorted.sort;
        self.is_first_conversion = false;

        info!(
            "event=gantt_convert module=gantt status=ok stems={} tasks={} sort_changed={} data_loaded={} duration_ms={}",
            input.query.stems.len(),
            sorted.tasks.len(),
            sorted.sort_changed,
            data_loaded,
            started_at.elapsed().as_millis()
        );
        GanttConversion {
            options,
            tasks: sorted.tasks,
            sort_changed: sorted.sort_changed,
        }
    }

    /// Forgets the remembered task order.
    pub fn reset_sort(&mut self) {
        self.tasks_sort = None;
    }

    fn create_options(&self, config: &GanttChartConfig, input: &PerspectiveInput) -> GanttOptions {
        let create_tasks = config
            .stems_configs
            .iter()
            .any(|stem_config| stem_config.can_create_task(&input.permissions));
        let zoom = config.zoom.unwrap_or(1.0);
        let initial_scroll = config
            .position
            .as_ref()
            .filter(|_| config.position_saved && self.is_first_conversion)
            .map(|position| position.value.clone());

        GanttOptions {
            swimlane_info: swimlane_info(config, input),
            resize_task_right: true,
            resize_progress: true,
            resize_task_left: true,
            resize_swimlanes: true,
            resize_milestones: true,
            drag_task_swimlanes: true,
            create_tasks,
            language: self.locale.clone(),
            lock_resize: config.lock_resize,
            date_format: GANTT_DATE_FORMAT.to_string(),
            initial_scroll,
            view_mode: config.mode,
            padding: zoom * GANTT_PADDING,
            column_width: zoom * GANTT_COLUMN_WIDTH,
            bar_height: zoom * GANTT_BAR_HEIGHT,
            font_size: zoom * GANTT_FONT_SIZE,
            header_font_size: zoom * GANTT_FONT_SIZE,
            swimlane_font_size: zoom * GANTT_FONT_SIZE,
        }
    }
}

/// One header per category position across stems, then per attribute
/// position.
fn swimlane_info(config: &GanttChartConfig, input: &PerspectiveInput) -> Vec<GanttSwimlaneInfo> {
    let mut columns: Vec<Vec<&QueryAttribute>> = Vec::new();
    for stem_config in &config.stems_configs {
        for (index, category) in stem_config.categories.iter().enumerate() {
            if columns.len() <= index {
                columns.resize_with(index + 1, Vec::new);
            }
            columns[index].push(category);
        }
    }
    let categories_length = columns.len();
    for stem_config in &config.stems_configs {
        for (index, attribute) in stem_config.attributes.iter().enumerate() {
            let index = categories_length + index;
            if columns.len() <= index {
                columns.resize_with(index + 1, Vec::new);
            }
            columns[index].push(attribute);
        }
    }

    columns
        .iter()
        .enumerate()
        .map(|(index, models)| {
            let mut backgrounds: Vec<String> = Vec::new();
            let mut titles: Vec<String> = Vec::new();
            for model in models {
                let Some(resource) =
                    find_resource_by_query_resource(&model.resource(), &input.collections, &input.link_types)
                else {
                    continue;
                };
                if let Some(color) = resource_color(resource, &input.collections) {
                    backgrounds.push(shade_color(color, 0.5));
                }
                if let Some(attribute) = resource.find_attribute(&model.attribute_id) {
                    if !titles.contains(&attribute.name) {
                        titles.push(attribute.name.clone());
                    }
                }
            }
            backgrounds.sort();
            backgrounds.dedup();
            let background = match backgrounds.as_slice() {
                [single] => Some(single.clone()),
                _ => None,
            };
            GanttSwimlaneInfo {
                background,
                color: COLOR_PRIMARY.to_string(),
                is_static: index >= categories_length,
                width: config.swimlane_widths.get(index).copied(),
                title: titles.join(", "),
            }
        })
        .collect()
}

fn convert_stem(
    aggregator: &StemAggregator<'_>,
    stem_config: &GanttChartStemConfig,
    stem_index: usize,
    maximum_swimlanes: usize,
) -> Vec<GanttTask> {
    let (Some(start), Some(end)) = (&stem_config.start, &stem_config.end) else {
        return Vec::new();
    };
    let constraint_data = aggregator.constraint_data();

    let grouping: Vec<&QueryAttribute> = stem_config.categories.iter().collect();
    let mut objects: Vec<(&str, &QueryAttribute)> = Vec::with_capacity(3);
    if let Some(name) = &stem_config.name {
        objects.push((KEY_NAME, name));
    }
    objects.push((KEY_START, start));
    objects.push((KEY_END, end));

    let milestone_keys: Vec<String> = (0..stem_config.milestones.len())
        .map(|index| format!("milestone{index}"))
        .collect();
    let mut meta: Vec<(&str, &QueryAttribute)> = Vec::new();
    if let Some(color) = &stem_config.color {
        meta.push((KEY_COLOR, color));
    }
    if let Some(progress) = &stem_config.progress {
        meta.push((KEY_PROGRESS, progress));
    }
    for (key, milestone) in milestone_keys.iter().zip(&stem_config.milestones) {
        meta.push((key.as_str(), &milestone.attribute));
    }

    let infos = aggregator.data_objects(&grouping, &objects, &meta, |value, attribute| {
        grouping_value(aggregator, value, attribute)
    });

    let start_constraint = aggregator.attribute_constraint(start);
    let end_constraint = aggregator.attribute_constraint(end);
    let mut stem_data = StemTasksData::default();
    let mut drafts = Vec::new();

    for info in infos {
        let name_dr = info.object_data_resources.get(KEY_NAME).copied();
        let start_dr = info.object_data_resources.get(KEY_START).copied();
        let end_dr = info.object_data_resources.get(KEY_END).copied();
        let start_value = attribute_value(start_dr, start);
        let end_value = attribute_value(end_dr, end);
        if !is_task_valid(&start_value, &start_constraint, &end_value, &end_constraint) {
            continue;
        }
        let Some(interval) =
            create_interval(&start_value, &start_constraint, &end_value, &end_constraint)
        else {
            continue;
        };

        let id = helper_data_id([name_dr, start_dr, end_dr]);
        let Some(data_resource) = name_dr.or(start_dr) else {
            continue;
        };
        let edit_attribute = stem_config.name.as_ref().unwrap_or(start);
        if aggregator.user_can_edit(edit_attribute, Some(data_resource)) {
            stem_data.editable_task_ids.push(id.clone());
        }
        if let Some(parent_id) = &data_resource.parent_id {
            stem_data
                .parent_children
                .entry(parent_id.clone())
                .or_default()
                .push(id.clone());
        }

        let (start_dr, end_dr) = if interval.swapped {
            (end_dr, start_dr)
        } else {
            (start_dr, end_dr)
        };
        drafts.push(TaskDraft {
            info,
            id,
            interval,
            name: name_dr,
            start: start_dr,
            end: end_dr,
        });
    }

    let can_edit_dependencies = start.resource_type == AttributesResourceType::Collection;
    let mut tasks = Vec::new();
    for draft in drafts {
        tasks.extend(create_tasks(
            aggregator,
            stem_config,
            stem_index,
            draft,
            &stem_data,
            can_edit_dependencies,
            maximum_swimlanes,
            constraint_data,
        ));
    }
    tasks
}

#[allow(clippy::too_many_arguments)]
fn create_tasks(
    aggregator: &StemAggregator<'_>,
    stem_config: &GanttChartStemConfig,
    stem_index: usize,
    draft: TaskDraft<'_>,
    stem_data: &StemTasksData,
    can_edit_dependencies: bool,
    maximum_swimlanes: usize,
    constraint_data: &ConstraintData,
) -> Vec<GanttTask> {
    let TaskDraft {
        info,
        id,
        interval,
        name: name_dr,
        start: start_dr,
        end: end_dr,
    } = draft;
    let task_config = if interval.swapped {
        stem_config.swapped()
    } else {
        stem_config.clone()
    };
    let (Some(task_start), Some(task_end)) = (&task_config.start, &task_config.end) else {
        return Vec::new();
    };

    let progress_drs: Vec<&DataResource> = info
        .meta_data_resources
        .get(KEY_PROGRESS)
        .cloned()
        .unwrap_or_default();
    let color_drs: Vec<&DataResource> = info
        .meta_data_resources
        .get(KEY_COLOR)
        .cloned()
        .unwrap_or_default();
    let milestone_drs: Vec<Option<&DataResource>> = (0..stem_config.milestones.len())
        .map(|index| {
            info.meta_data_resources
                .get(&format!("milestone{index}"))
                .and_then(|resources| resources.first().copied())
        })
        .collect();

    let progress = create_progress(aggregator, &task_config, &progress_drs, constraint_data);
    let (min_progress, max_progress) = progress_bounds(aggregator, &task_config);

    let color_attribute = task_config.name.as_ref().unwrap_or(task_start);
    let resource_color = aggregator
        .resource_color(color_attribute)
        .unwrap_or_else(|| COLOR_PRIMARY.to_string());
    let bar_color = match aggregator.attribute_color(task_config.color.as_ref(), &color_drs) {
        Some(color) if task_config.progress.is_some() => shade_color(&color, 0.3),
        Some(color) => color,
        None => shade_color(&resource_color, 0.5),
    };
    let text_color = contrast_color(&bar_color);

    let milestones = create_milestones(aggregator, stem_config, &interval, &milestone_drs);

    let start_drag = aggregator.is_attribute_editable(task_start, start_dr)
        && aggregator.user_can_edit(task_start, start_dr);
    let end_drag = aggregator.is_attribute_editable(task_end, end_dr)
        && aggregator.user_can_edit(task_end, end_dr);
    let draggable = (start_drag && (end_drag || interval.end_constraint.is_duration()))
        || (end_drag && (start_drag || interval.start_constraint.is_duration()));
    let progress_drag = task_config.progress.as_ref().is_some_and(|progress| {
        progress_drs.len() == 1
            && aggregator.is_attribute_editable(progress, progress_drs.first().copied())
            && aggregator.user_can_edit(progress, progress_drs.first().copied())
    });

    let mut swimlanes: Vec<Option<GanttSwimlane>> = info
        .grouping_values
        .iter()
        .zip(&stem_config.categories)
        .map(|(value, category)| {
            Some(format_swimlane_value(
                value,
                &aggregator.display_constraint(category),
                constraint_data,
            ))
        })
        .collect();
    swimlanes.resize(maximum_swimlanes.max(swimlanes.len()), None);
    for model in &task_config.attributes {
        let data_resource = [
            (task_config.name.as_ref(), name_dr),
            (Some(task_start), start_dr),
            (Some(task_end), end_dr),
        ]
        .into_iter()
        .find_map(|(attribute, data_resource)| {
            attribute
                .filter(|attribute| attribute.same_resource(model))
                .map(|_| data_resource)
        })
        .flatten();
        let value = attribute_value(data_resource, model);
        swimlanes.push(Some(format_swimlane_value(
            &value,
            &aggregator.display_constraint(model),
            constraint_data,
        )));
    }

    let Some(main_dr) = name_dr.or(start_dr).or(end_dr) else {
        return Vec::new();
    };
    let main_attribute = task_config.name.as_ref().unwrap_or(task_start);
    let dependencies = if can_edit_dependencies {
        stem_data
            .parent_children
            .get(&main_dr.id)
            .cloned()
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    let metadata = GanttTaskMetadata {
        data_resource_id: main_dr.id.clone(),
        resource_id: main_attribute.resource_id.clone(),
        resource_type: main_attribute.resource_type,
        stem_index,
        name_data_id: name_dr.map(|data_resource| data_resource.id.clone()),
        start_data_id: start_dr.map(|data_resource| data_resource.id.clone()),
        end_data_id: end_dr.map(|data_resource| data_resource.id.clone()),
        progress_data_ids: progress_drs
            .iter()
            .map(|data_resource| data_resource.id.clone())
            .collect(),
        milestone_data_ids: milestone_drs
            .iter()
            .map(|data_resource| data_resource.map(|data_resource| data_resource.id.clone()))
            .collect(),
        swimlanes_data_resources_ids: info
            .grouping_data_resources
            .iter()
            .map(|data_resource| data_resource.id.clone())
            .collect(),
        data_resource_chain: info.data_resources_chain.clone(),
        stem_config: task_config.clone(),
    };

    let names = task_names(aggregator, task_config.name.as_ref(), name_dr, constraint_data);
    names
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            let task_id = if index == 0 {
                id.clone()
            } else {
                format!("{id}:{index}")
            };
            // Dependencies link records, so only the base id of a split
            // task is offered as a target.
            let allowed_dependencies = if can_edit_dependencies {
                stem_data
                    .editable_task_ids
                    .iter()
                    .filter(|editable| **editable != id)
                    .cloned()
                    .collect()
            } else {
                Vec::new()
            };
            GanttTask {
                id: task_id,
                name,
                start: interval.start.clone(),
                end: interval.end.clone(),
                progress,
                dependencies: dependencies.clone(),
                allowed_dependencies,
                bar_color: bar_color.clone(),
                milestones: milestones.clone(),
                start_drag,
                end_drag,
                draggable,
                progress_drag,
                text_color: text_color.clone(),
                swimlanes: swimlanes.clone(),
                min_progress,
                max_progress,
                swapped: interval.swapped,
                metadata: metadata.clone(),
            }
        })
        .collect()
}

fn attribute_value(data_resource: Option<&DataResource>, attribute: &QueryAttribute) -> Value {
    data_resource
        .and_then(|data_resource| data_resource.value(&attribute.attribute_id))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Joins the ids of the name, start and end records.
fn helper_data_id(data_resources: [Option<&DataResource>; 3]) -> String {
    data_resources
        .iter()
        .flatten()
        .map(|data_resource| data_resource.id.as_str())
        .collect::<Vec<_>>()
        .join(":")
}

/// Value swimlanes are grouped by: identities for options and users, the
/// display text for everything else.
fn grouping_value(aggregator: &StemAggregator<'_>, value: &Value, attribute: &QueryAttribute) -> Value {
    let constraint = aggregator.display_constraint(attribute);
    match constraint.constraint_type() {
        ConstraintType::Select | ConstraintType::User | ConstraintType::Boolean => {
            constraint.serialize_value(value, aggregator.constraint_data())
        }
        _ => {
            let formatted = constraint.format_value(value, aggregator.constraint_data());
            if formatted.is_empty() {
                Value::Null
            } else {
                Value::String(formatted)
            }
        }
    }
}

fn format_swimlane_value(value: &Value, constraint: &Constraint, data: &ConstraintData) -> GanttSwimlane {
    let formatted = constraint.format_value(value, data);
    if formatted.is_empty() {
        return GanttSwimlane {
            value: Value::String(String::new()),
            ..GanttSwimlane::default()
        };
    }

    match constraint {
        Constraint::Color => GanttSwimlane {
            value: Value::String(formatted.clone()),
            background: Some(formatted),
            ..GanttSwimlane::default()
        },
        Constraint::Boolean => GanttSwimlane {
            value: value.clone(),
            swimlane_type: Some(GanttSwimlaneType::Checkbox),
            ..GanttSwimlane::default()
        },
        _ => {
            let text_background = constraint
                .matching_options(value)
                .first()
                .and_then(|option| option.background.clone());
            let text_color = text_background.as_deref().map(contrast_color);
            let avatar = match constraint {
                Constraint::User(_) => expand(value)
                    .into_iter()
                    .find_map(value_to_text)
                    .map(|email| avatar_url(&email)),
                _ => None,
            };
            let title = match constraint {
                Constraint::User(config) if config.only_icon => String::new(),
                _ => formatted,
            };
            GanttSwimlane {
                value: value.clone(),
                title,
                text_background,
                text_color,
                avatar_url: avatar,
                ..GanttSwimlane::default()
            }
        }
    }
}

/// Aggregates, formats and parses progress; anything unparsable is 0.
fn create_progress(
    aggregator: &StemAggregator<'_>,
    stem_config: &GanttChartStemConfig,
    progress_drs: &[&DataResource],
    constraint_data: &ConstraintData,
) -> f64 {
    let Some(progress) = &stem_config.progress else {
        return 0.0;
    };
    let constraint = aggregator.attribute_constraint(progress);
    let values: Vec<Value> = progress_drs
        .iter()
        .filter_map(|data_resource| data_resource.value(&progress.attribute_id))
        .cloned()
        .collect();
    let kind = stem_config
        .progress_aggregation
        .unwrap_or(DataAggregationType::Avg);
    let Some(aggregated) = aggregate_data_values(kind, &values, &constraint, constraint_data) else {
        return 0.0;
    };
    let formatted = if kind.is_count() {
        aggregated.to_string()
    } else {
        constraint.format_value(&number_value(aggregated), constraint_data)
    };
    strip_trailing_percent(&formatted)
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|progress| progress.is_finite())
        .map_or(0.0, |progress| progress.max(0.0))
}

fn progress_bounds(
    aggregator: &StemAggregator<'_>,
    stem_config: &GanttChartStemConfig,
) -> (Option<f64>, Option<f64>) {
    let Some(progress) = &stem_config.progress else {
        return (None, None);
    };
    match aggregator.attribute_constraint(progress) {
        Constraint::Percentage(config) => (
            config.min_value.map(|min| min.max(0.0)),
            config.max_value,
        ),
        _ => (None, None),
    }
}

/// Milestones chain from the task start: each resolved milestone becomes the
/// reference point of the next one.
fn create_milestones(
    aggregator: &StemAggregator<'_>,
    stem_config: &GanttChartStemConfig,
    interval: &TaskInterval,
    milestone_drs: &[Option<&DataResource>],
) -> Vec<Milestone> {
    let mut last_value = interval.start_raw.clone();
    let mut last_constraint = interval.start_constraint.clone();
    let mut milestones = Vec::with_capacity(stem_config.milestones.len());

    for (model, data_resource) in stem_config.milestones.iter().zip(milestone_drs) {
        let current = attribute_value(*data_resource, &model.attribute);
        let current_constraint = aggregator.attribute_constraint(&model.attribute);
        let resolved = if current.is_null() {
            None
        } else {
            create_interval(&last_value, &last_constraint, &current, &current_constraint)
        };

        match resolved {
            Some(resolved) => {
                milestones.push(Milestone {
                    end: Some(resolved.end.clone()),
                    draggable: aggregator.user_can_edit(&model.attribute, *data_resource),
                    color: model.color.clone(),
                });
                last_value = Value::String(resolved.end);
                last_constraint = Constraint::DateTime(DateTimeConstraintConfig::new(GANTT_DATE_FORMAT));
            }
            None => milestones.push(Milestone {
                end: None,
                draggable: false,
                color: model.color.clone(),
            }),
        }
    }
    milestones
}

/// One name per array item; text names lose their markup.
fn task_names(
    aggregator: &StemAggregator<'_>,
    name_attribute: Option<&QueryAttribute>,
    name_dr: Option<&DataResource>,
    constraint_data: &ConstraintData,
) -> Vec<String> {
    let Some(attribute) = name_attribute else {
        return vec![String::new()];
    };
    let constraint = aggregator.attribute_constraint(attribute);
    let value = attribute_value(name_dr, attribute);
    let values: Vec<&Value> = match &value {
        Value::Array(items) if !items.is_empty() => items.iter().collect(),
        other => vec![other],
    };
    values
        .into_iter()
        .map(|value| {
            let preview = constraint.preview_value(value, constraint_data);
            if matches!(constraint, Constraint::Text) {
                strip_html_tags(&preview)
            } else {
                preview
            }
        })
        .collect()
}

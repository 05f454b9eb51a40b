//! Kanban conversion.
//!
//! # Responsibility
//! - Group the records of every configured stem into columns titled by the
//!   grouping attribute's values.
//! - Keep column identities stable across conversions.
//! - Compute column summaries, due hours and creatable resources.
//!
//! # Invariants
//! - A record appears at most once per column.
//! - Records with no usable title land in the other column.
//! - Re-running with unchanged input yields the same column ids and order.

use crate::aggregation::{resolve_stem_resources, StemAggregator};
use crate::constraint::datetime::{end_of_day, format_has_hours, now, parse_date_time};
use crate::constraint::{
    aggregate_data_values, format_aggregated_value, resolve_constraint, Constraint, ConstraintData,
    DataAggregationType,
};
use crate::kanban::config::{column_width, KanbanColumn, KanbanConfig, KanbanStemConfig, KanbanValueType};
use crate::kanban::data::{KanbanCard, KanbanCreateResource, KanbanData, KanbanDataColumn};
use crate::model::data_resource::DataResource;
use crate::model::input::PerspectiveInput;
use crate::model::query::{
    attributes_include, find_attribute_by_query_attribute, find_constraint_by_query_attribute,
    find_resource_by_query_resource, QueryAttribute,
};
use crate::model::resource::{find_attribute_constraint, find_resource, AttributesResource, AttributesResourceType};
use crate::model::settings::sort_by_view_settings;
use chrono::NaiveDateTime;
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Result of one conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KanbanConversion {
    /// Input config with columns rebuilt from the result; callers persist it.
    pub config: KanbanConfig,
    pub data: KanbanData,
}

/// Stateful converter scoped to one Kanban view.
///
/// Remembers the column ids of its previous run so titles keep their id even
/// when the caller did not persist the returned config.
pub struct KanbanConverter {
    column_ids: HashMap<String, String>,
    other_column_id: Option<String>,
    clock: fn() -> NaiveDateTime,
}

impl Default for KanbanConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct ColumnBuilder {
    cards: Vec<KanbanCard>,
    created_from_attributes: Vec<QueryAttribute>,
    constraint: Option<Constraint>,
    summary: Option<String>,
}

impl ColumnBuilder {
    fn contains(&self, data_resource: &DataResource, resource_type: AttributesResourceType) -> bool {
        self.cards.iter().any(|card| {
            card.data_resource.id == data_resource.id && card.resource_type == resource_type
        })
    }
}

/// Columns keyed by title, in insertion order.
#[derive(Debug, Default)]
struct ColumnsMap {
    titles: Vec<String>,
    columns: HashMap<String, ColumnBuilder>,
}

impl ColumnsMap {
    fn get_or_insert(&mut self, title: &str) -> &mut ColumnBuilder {
        if !self.columns.contains_key(title) {
            self.titles.push(title.to_string());
        }
        self.columns.entry(title.to_string()).or_default()
    }

    fn contains(&self, title: &str) -> bool {
        self.columns.contains_key(title)
    }

    fn get_mut(&mut self, title: &str) -> Option<&mut ColumnBuilder> {
        self.columns.get_mut(title)
    }

    fn remove(&mut self, title: &str) -> Option<ColumnBuilder> {
        self.titles.retain(|existing| existing != title);
        self.columns.remove(title)
    }

    fn len(&self) -> usize {
        self.titles.len()
    }
}

#[derive(Debug, Default)]
struct AggregatedColumn {
    values: Vec<Value>,
    constraint: Option<Constraint>,
}

#[derive(Debug, Default)]
struct Aggregated {
    columns: HashMap<String, AggregatedColumn>,
    other: AggregatedColumn,
}

impl KanbanConverter {
    pub fn new() -> Self {
        Self::with_clock(now)
    }

    /// Uses `clock` instead of the wall clock for due hours.
    pub fn with_clock(clock: fn() -> NaiveDateTime) -> Self {
        Self {
            column_ids: HashMap::new(),
            other_column_id: None,
            clock,
        }
    }

    /// Converts the records of `input` into a board.
    ///
    /// # Side effects
    /// - Remembers the resulting column ids for the next conversion.
    /// - Emits a `kanban_convert` logging event.
    pub fn convert(&mut self, config: &KanbanConfig, input: &PerspectiveInput) -> KanbanConversion {
        let started_at = Instant::now();
        let now = (self.clock)();

        let mut columns = initial_columns(config, input);
        let mut other = ColumnBuilder::default();
        let mut aggregated = Aggregated::default();

        for (stem_index, stem_config) in config.stems_configs.iter().enumerate() {
            group_stem(
                stem_index,
                stem_config,
                input,
                now,
                &mut columns,
                &mut other,
                &mut aggregated,
            );
        }

        if config.is_aggregation_defined() {
            fill_summaries(config, input, &mut columns, &mut other, &aggregated);
        }

        let data = self.create_kanban_data(config, input, columns, other);
        self.remember_ids(&data);
        let config = pick_config_from_data(config, &data);

        info!(
            "event=kanban_convert module=kanban status=ok stems={} columns={} cards={} duration_ms={}",
            config.stems_configs.len(),
            data.columns.len(),
            data.all_columns().map(|column| column.cards.len()).sum::<usize>(),
            started_at.elapsed().as_millis()
        );
        KanbanConversion { config, data }
    }

    fn create_kanban_data(
        &self,
        config: &KanbanConfig,
        input: &PerspectiveInput,
        mut columns: ColumnsMap,
        other: ColumnBuilder,
    ) -> KanbanData {
        let width = column_width(config.column_size);
        let selected: Vec<QueryAttribute> = config
            .stems_configs
            .iter()
            .map(|stem_config| stem_config.attribute.cleaned())
            .collect();

        let mut result: Vec<KanbanDataColumn> = Vec::with_capacity(columns.len());
        for current in &config.columns {
            let title = current.title.clone();
            if result.iter().any(|column| column.title == title) {
                continue;
            }
            if !columns.contains(&title)
                && !attributes_intersect(&current.created_from_attributes, &selected)
            {
                continue;
            }

            let has_cards = columns
                .get_mut(&title)
                .is_some_and(|builder| !builder.cards.is_empty());
            if !has_cards
                && !column_has_valid_attribute(&title, &current.created_from_attributes, input)
            {
                debug!(
                    "event=kanban_column_dropped module=kanban status=ok column_id={}",
                    current.id
                );
                continue;
            }

            let builder = columns.remove(&title).unwrap_or_default();
            let constraint = builder
                .constraint
                .or_else(|| constraint_for_attributes(&current.created_from_attributes, input));
            result.push(KanbanDataColumn {
                id: self.column_id(&title, Some(current.id.as_str())),
                title,
                width,
                cards: sort_cards(builder.cards, input),
                created_from_attributes: merge_attributes(
                    builder.created_from_attributes,
                    &current.created_from_attributes,
                ),
                constraint,
                summary: builder.summary,
                create_resources: Vec::new(),
            });
        }

        let remaining: Vec<String> = columns.titles.clone();
        for title in remaining {
            let Some(builder) = columns.remove(&title) else {
                continue;
            };
            result.push(KanbanDataColumn {
                id: self.column_id(&title, None),
                title,
                width,
                cards: sort_cards(builder.cards, input),
                created_from_attributes: builder.created_from_attributes,
                constraint: builder.constraint,
                summary: builder.summary,
                create_resources: Vec::new(),
            });
        }

        let other_column_id = config
            .other_column
            .as_ref()
            .map(|column| column.id.clone())
            .filter(|id| !id.is_empty())
            .or_else(|| self.other_column_id.clone())
            .unwrap_or_else(generate_id);
        let mut other_column = KanbanDataColumn {
            id: other_column_id,
            title: String::new(),
            width,
            cards: sort_cards(other.cards, input),
            created_from_attributes: other.created_from_attributes,
            constraint: other.constraint,
            summary: other.summary,
            create_resources: Vec::new(),
        };

        let create_resources = all_create_resources(config, input);
        for column in &mut result {
            column.create_resources = column_create_resources(column, &create_resources, input);
        }
        other_column.create_resources =
            column_create_resources(&other_column, &create_resources, input);

        KanbanData {
            stems_configs: config.stems_configs.clone(),
            columns: result,
            other_column,
        }
    }

    /// Prefers the configured id, then the remembered one, then a new one.
    fn column_id(&self, title: &str, configured: Option<&str>) -> String {
        configured
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| self.column_ids.get(title).cloned())
            .unwrap_or_else(generate_id)
    }

    fn remember_ids(&mut self, data: &KanbanData) {
        self.column_ids = data
            .columns
            .iter()
            .map(|column| (column.title.clone(), column.id.clone()))
            .collect();
        self.other_column_id = Some(data.other_column.id.clone());
    }
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Seeds empty columns from the select options of the first stem's attribute
/// when the config has no usable columns.
fn initial_columns(config: &KanbanConfig, input: &PerspectiveInput) -> ColumnsMap {
    let mut columns = ColumnsMap::default();
    let Some(first_attribute) = config
        .stems_configs
        .first()
        .map(|stem_config| &stem_config.attribute)
    else {
        return columns;
    };

    let any_valid = config.columns.iter().any(|column| {
        column_has_valid_attribute(&column.title, std::slice::from_ref(first_attribute), input)
    });
    if any_valid {
        return columns;
    }

    let constraint =
        find_constraint_by_query_attribute(first_attribute, &input.collections, &input.link_types);
    if let Some(Constraint::Select(select)) = constraint {
        for value in select.option_values() {
            let column = columns.get_or_insert(value);
            column.created_from_attributes = vec![first_attribute.cleaned()];
            column.constraint = constraint.cloned();
        }
    }
    columns
}

fn group_stem(
    stem_index: usize,
    stem_config: &KanbanStemConfig,
    input: &PerspectiveInput,
    now: NaiveDateTime,
    columns: &mut ColumnsMap,
    other: &mut ColumnBuilder,
    aggregated: &mut Aggregated,
) {
    let Some(attribute) =
        find_attribute_by_query_attribute(&stem_config.attribute, &input.collections, &input.link_types)
    else {
        debug!(
            "event=kanban_stem_skipped module=kanban status=ok stem_index={} reason=missing_attribute",
            stem_index
        );
        return;
    };

    let constraint = resolve_constraint(
        attribute.constraint.as_ref(),
        stem_config.attribute.constraint.as_ref(),
    );
    let aggregation_constraint = stem_config.aggregation.as_ref().and_then(|aggregation| {
        find_constraint_by_query_attribute(aggregation, &input.collections, &input.link_types).cloned()
    });

    let aggregator = StemAggregator::new(
        input,
        &stem_config.stem,
        input.data.data_by_stems.get(stem_index),
    );
    let card_query_resource = stem_config.card_resource();
    let card_resource = aggregator.resource_for(&card_query_resource);
    let permissions = input.permissions.for_query_resource(&card_query_resource);
    let created_by = stem_config.attribute.cleaned();

    let groups = aggregator.group_by_attribute(
        &stem_config.attribute,
        &constraint,
        card_query_resource.resource_index,
    );
    for group in groups {
        let show_due_hours = group
            .title
            .as_ref()
            .map_or(true, |title| !stem_config.done_column_titles.contains(title));

        let (column, mut column_aggregated) = match group.title.as_deref() {
            Some(title) => {
                let column = columns.get_or_insert(title);
                if !attributes_include(&column.created_from_attributes, &created_by) {
                    column.created_from_attributes.push(created_by.clone());
                }
                // Stems without an aggregation attribute leave no summary.
                let column_aggregated = if stem_config.aggregation.is_some() {
                    Some(aggregated.columns.entry(title.to_string()).or_default())
                } else {
                    None
                };
                (column, column_aggregated)
            }
            None => (&mut *other, Some(&mut aggregated.other)),
        };
        if column.constraint.is_none() {
            column.constraint = Some(constraint.clone());
        }
        if let Some(column_aggregated) = column_aggregated.as_deref_mut() {
            if stem_config.aggregation.is_some() && column_aggregated.constraint.is_none() {
                column_aggregated.constraint = aggregation_constraint.clone();
            }
        }

        for item in group.items {
            if column.contains(item.data_resource, card_query_resource.resource_type) {
                continue;
            }
            if let (Some(aggregation), Some(column_aggregated)) =
                (&stem_config.aggregation, column_aggregated.as_deref_mut())
            {
                if let Some(value) = item.data_resource.value(&aggregation.attribute_id) {
                    column_aggregated.values.push(value.clone());
                }
            }
            let due_hours = if show_due_hours {
                due_hours(item.data_resource, card_resource, stem_config, now)
            } else {
                None
            };
            column.cards.push(KanbanCard {
                data_resource: item.data_resource.clone(),
                resource_id: card_query_resource.resource_id.clone(),
                resource_type: card_query_resource.resource_type,
                stem_index,
                permissions,
                data_resources_chain: item
                    .chain
                    .iter()
                    .map(|data_resource| data_resource.id.clone())
                    .collect(),
                due_hours,
            });
        }
    }
}

/// Hours from `now` to the card's due date.
///
/// Dates without hour precision are due at the end of their day.
fn due_hours(
    data_resource: &DataResource,
    card_resource: Option<AttributesResource<'_>>,
    stem_config: &KanbanStemConfig,
    now: NaiveDateTime,
) -> Option<f64> {
    let due_date = stem_config.due_date.as_ref()?;
    let value = data_resource.value(&due_date.attribute_id)?;
    let constraint = card_resource
        .and_then(|resource| find_attribute_constraint(resource.attributes(), &due_date.attribute_id));
    let format = match constraint {
        Some(Constraint::DateTime(config)) => Some(config.format.as_str()),
        _ => None,
    };

    let parsed = parse_date_time(value, format)?;
    let due = match format {
        Some(format) if !format_has_hours(format) => end_of_day(parsed)?,
        _ => parsed,
    };
    Some((due - now).num_milliseconds() as f64 / MILLIS_PER_HOUR)
}

fn fill_summaries(
    config: &KanbanConfig,
    input: &PerspectiveInput,
    columns: &mut ColumnsMap,
    other: &mut ColumnBuilder,
    aggregated: &Aggregated,
) {
    let Some(aggregation) = config.aggregation else {
        return;
    };
    let kind = aggregation.aggregation;
    let constraint_data = &input.constraint_data;

    match aggregation.value_type {
        KanbanValueType::AllPercentage => {
            let constraint = config
                .stems_configs
                .iter()
                .filter_map(|stem_config| stem_config.aggregation.as_ref())
                .find_map(|attribute| {
                    find_constraint_by_query_attribute(attribute, &input.collections, &input.link_types)
                })
                .cloned()
                .unwrap_or_default();
            let value_of = |column: &AggregatedColumn| {
                aggregate_data_values(kind, &column.values, &constraint, constraint_data).unwrap_or(0.0)
            };

            let values: Vec<(&String, f64)> = aggregated
                .columns
                .iter()
                .map(|(title, column)| (title, value_of(column)))
                .collect();
            let other_value = value_of(&aggregated.other);
            let total = values.iter().map(|(_, value)| value).sum::<f64>() + other_value;
            if total <= 0.0 {
                return;
            }

            for (title, value) in values {
                if let Some(column) = columns.get_mut(title) {
                    column.summary = Some(format_relative_value(value, total));
                }
            }
            other.summary = Some(format_relative_value(other_value, total));
        }
        KanbanValueType::Default => {
            for (title, column_aggregated) in &aggregated.columns {
                if let Some(column) = columns.get_mut(title) {
                    column.summary = format_summary(kind, column_aggregated, constraint_data);
                }
            }
            other.summary = format_summary(kind, &aggregated.other, constraint_data);
        }
    }
}

fn format_summary(
    kind: DataAggregationType,
    aggregated: &AggregatedColumn,
    constraint_data: &ConstraintData,
) -> Option<String> {
    let constraint = aggregated.constraint.clone().unwrap_or_default();
    let value = aggregate_data_values(kind, &aggregated.values, &constraint, constraint_data);
    format_aggregated_value(kind, value, &constraint, constraint_data)
}

fn format_relative_value(value: f64, total: f64) -> String {
    format!("{:.2}%", value / total * 100.0)
}

fn sort_cards(mut cards: Vec<KanbanCard>, input: &PerspectiveInput) -> Vec<KanbanCard> {
    sort_by_view_settings(
        &mut cards,
        &input.settings,
        &input.collections,
        &input.link_types,
        &input.constraint_data,
        |card| (&card.data_resource, card.resource_type, card.resource_id.as_str()),
    );
    cards
}

/// Stored columns without attributes match any selection.
fn attributes_intersect(previous: &[QueryAttribute], selected: &[QueryAttribute]) -> bool {
    previous.is_empty()
        || previous
            .iter()
            .any(|attribute| attributes_include(selected, attribute))
}

fn merge_attributes(mut attributes: Vec<QueryAttribute>, others: &[QueryAttribute]) -> Vec<QueryAttribute> {
    for other in others {
        if !attributes_include(&attributes, other) {
            attributes.push(other.cleaned());
        }
    }
    attributes
}

/// An empty column survives when any of its attributes still exists and, for
/// select attributes, still offers the title as an option.
fn column_has_valid_attribute(title: &str, attributes: &[QueryAttribute], input: &PerspectiveInput) -> bool {
    attributes.iter().any(|query_attribute| {
        let Some(attribute) =
            find_attribute_by_query_attribute(query_attribute, &input.collections, &input.link_types)
        else {
            return false;
        };
        match &attribute.constraint {
            Some(constraint @ Constraint::Select(_)) => {
                !constraint.matching_options(&Value::String(title.to_string())).is_empty()
            }
            _ => true,
        }
    })
}

fn constraint_for_attributes(attributes: &[QueryAttribute], input: &PerspectiveInput) -> Option<Constraint> {
    attributes.iter().find_map(|attribute| {
        find_constraint_by_query_attribute(attribute, &input.collections, &input.link_types).cloned()
    })
}

fn all_create_resources(config: &KanbanConfig, input: &PerspectiveInput) -> Vec<KanbanCreateResource> {
    let mut resources = Vec::new();
    for (stem_index, stem_config) in config.stems_configs.iter().enumerate() {
        let card_resource = stem_config.card_resource();
        if find_resource_by_query_resource(&card_resource, &input.collections, &input.link_types)
            .is_none()
        {
            continue;
        }
        if !input
            .permissions
            .for_query_resource(&card_resource)
            .data_contribute
        {
            continue;
        }
        if !linking_resource_allows_contribute(stem_config, input) {
            continue;
        }
        resources.push(KanbanCreateResource {
            resource_id: card_resource.resource_id,
            resource_type: card_resource.resource_type,
            kanban_attribute: stem_config.attribute.clone(),
            stem_index,
        });
    }
    resources
}

/// Creating a card in a collection linked to the grouping attribute also
/// creates a link instance, so the adjacent link type must accept it too.
fn linking_resource_allows_contribute(stem_config: &KanbanStemConfig, input: &PerspectiveInput) -> bool {
    let Some(resource) = &stem_config.resource else {
        return true;
    };
    let attribute_index = stem_config.attribute.resource_index;
    if resource.resource_type != AttributesResourceType::Collection
        || resource.resource_index == attribute_index
    {
        return true;
    }

    let linking_index = if resource.resource_index > attribute_index {
        resource.resource_index - 1
    } else {
        resource.resource_index + 1
    };
    let resources = resolve_stem_resources(&stem_config.stem, &input.collections, &input.link_types);
    resources
        .get(linking_index)
        .filter(|linking| linking.resource_type() == AttributesResourceType::LinkType)
        .is_some_and(|linking| {
            input
                .permissions
                .for_resource(AttributesResourceType::LinkType, linking.id())
                .data_contribute
        })
}

fn column_create_resources(
    column: &KanbanDataColumn,
    create_resources: &[KanbanCreateResource],
    input: &PerspectiveInput,
) -> Vec<KanbanCreateResource> {
    create_resources
        .iter()
        .filter(|create_resource| column_can_create_resource(column, create_resource, input))
        .cloned()
        .collect()
}

fn column_can_create_resource(
    column: &KanbanDataColumn,
    create_resource: &KanbanCreateResource,
    input: &PerspectiveInput,
) -> bool {
    if attributes_include(&column.created_from_attributes, &create_resource.kanban_attribute) {
        return true;
    }
    let attribute = &create_resource.kanban_attribute;
    if attribute.resource_id != create_resource.resource_id
        || attribute.resource_type != create_resource.resource_type
    {
        return false;
    }

    let resource_constraint = find_resource(
        create_resource.resource_type,
        &create_resource.resource_id,
        &input.collections,
        &input.link_types,
    )
    .and_then(|resource| find_attribute_constraint(resource.attributes(), &attribute.attribute_id))
    .cloned()
    .unwrap_or_default();
    let Some(column_constraint) = &column.constraint else {
        return false;
    };
    if resource_constraint.constraint_type() != column_constraint.constraint_type() {
        return false;
    }
    match &resource_constraint {
        Constraint::Select(select) => select.option_values().any(|value| value == column.title),
        _ => true,
    }
}

fn pick_config_from_data(config: &KanbanConfig, data: &KanbanData) -> KanbanConfig {
    KanbanConfig {
        columns: data.columns.iter().map(pick_config_column).collect(),
        other_column: Some(pick_config_column(&data.other_column)),
        ..config.clone()
    }
}

fn pick_config_column(column: &KanbanDataColumn) -> KanbanColumn {
    KanbanColumn {
        id: column.id.clone(),
        title: column.title.clone(),
        width: column.width,
        created_from_attributes: column.created_from_attributes.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::{attributes_intersect, format_relative_value, KanbanConverter};
    use crate::constraint::{Constraint, SelectConstraintConfig};
    use crate::kanban::config::{KanbanConfig, KanbanStemConfig};
    use crate::model::data_resource::{DataResource, DocumentsAndLinksData, DocumentsAndLinksStemData};
    use crate::model::input::PerspectiveInput;
    use crate::model::query::{QueryResource, QueryStem};
    use crate::model::resource::{Attribute, Collection};

    fn input(values: &[&str]) -> PerspectiveInput {
        PerspectiveInput {
            collections: vec![Collection::new("c1", "Tasks").with_attribute(
                Attribute::new("a1", "State").with_constraint(Constraint::Select(
                    SelectConstraintConfig::with_options(["Todo", "Done"]),
                )),
            )],
            data: DocumentsAndLinksData {
                data_by_stems: vec![DocumentsAndLinksStemData {
                    documents: values
                        .iter()
                        .enumerate()
                        .map(|(index, value)| {
                            DataResource::document(format!("d{index}"), "c1").with_value("a1", *value)
                        })
                        .collect(),
                    link_instances: Vec::new(),
                }],
            },
            ..PerspectiveInput::default()
        }
    }

    fn config() -> KanbanConfig {
        KanbanConfig {
            stems_configs: vec![KanbanStemConfig::new(
                QueryStem::new("c1"),
                QueryResource::collection("c1", 0).attribute("a1"),
            )],
            ..KanbanConfig::default()
        }
    }

    #[test]
    fn remembers_ids_without_persisted_config() {
        let input = input(&["Done", "Later"]);
        let mut converter = KanbanConverter::new();
        let first = converter.convert(&config(), &input);
        let second = converter.convert(&config(), &input);

        let ids = |data: &crate::kanban::KanbanData| {
            data.columns
                .iter()
                .map(|column| (column.title.clone(), column.id.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&first.data), ids(&second.data));
        assert_eq!(first.data.other_column.id, second.data.other_column.id);
    }

    #[test]
    fn stored_columns_without_attributes_always_intersect() {
        let selected = vec![QueryResource::collection("c1", 0).attribute("a1")];
        assert!(attributes_intersect(&[], &selected));
        assert!(attributes_intersect(&selected, &selected));
        assert!(!attributes_intersect(
            &[QueryResource::collection("c1", 0).attribute("a2")],
            &selected
        ));
    }

    #[test]
    fn relative_values_use_two_decimals() {
        assert_eq!(format_relative_value(1.0, 3.0), "33.33%");
        assert_eq!(format_relative_value(0.0, 3.0), "0.00%");
    }
}

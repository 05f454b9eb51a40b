use chrono::{NaiveDate, NaiveDateTime};
use lumeer_core::constraint::{
    Constraint, DataAggregationType, DateTimeConstraintConfig, NumberConstraintConfig,
    SelectConstraintConfig,
};
use lumeer_core::kanban::{
    KanbanAggregation, KanbanColumn, KanbanConfig, KanbanConverter, KanbanData, KanbanStemConfig,
    KanbanValueType,
};
use lumeer_core::model::data_resource::{
    DataResource, DocumentsAndLinksData, DocumentsAndLinksStemData,
};
use lumeer_core::model::input::PerspectiveInput;
use lumeer_core::model::permissions::{AllowedPermissions, ResourcesPermissions};
use lumeer_core::model::query::{QueryAttribute, QueryResource, QueryStem};
use lumeer_core::model::resource::{Attribute, Collection, LinkType};
use serde_json::{json, Value};

fn state_attribute() -> QueryAttribute {
    QueryResource::collection("tasks", 0).attribute("state")
}

fn tasks_collection() -> Collection {
    Collection::new("tasks", "Tasks")
        .with_color("#00b388")
        .with_attribute(Attribute::new("state", "State").with_constraint(Constraint::Select(
            SelectConstraintConfig::with_options(["Done", "In progress", "In Backlog"]),
        )))
        .with_attribute(
            Attribute::new("points", "Points")
                .with_constraint(Constraint::Number(NumberConstraintConfig::default())),
        )
        .with_attribute(Attribute::new("due", "Due").with_constraint(Constraint::DateTime(
            DateTimeConstraintConfig::new("YYYY-MM-DD"),
        )))
        .with_attribute(Attribute::new("note", "Note"))
}

fn input_with(documents: Vec<DataResource>) -> PerspectiveInput {
    PerspectiveInput {
        collections: vec![tasks_collection()],
        data: DocumentsAndLinksData {
            data_by_stems: vec![DocumentsAndLinksStemData {
                documents,
                link_instances: Vec::new(),
            }],
        },
        ..PerspectiveInput::default()
    }
}

fn documents(values: &[Value]) -> Vec<DataResource> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            DataResource::document(format!("d{index}"), "tasks").with_value("state", value.clone())
        })
        .collect()
}

fn config_for(attribute: QueryAttribute) -> KanbanConfig {
    KanbanConfig {
        stems_configs: vec![KanbanStemConfig::new(QueryStem::new("tasks"), attribute)],
        ..KanbanConfig::default()
    }
}

fn card_ids(data: &KanbanData, title: &str) -> Vec<String> {
    data.columns
        .iter()
        .find(|column| column.title == title)
        .map(|column| {
            column
                .cards
                .iter()
                .map(|card| card.data_resource.id.clone())
                .collect()
        })
        .unwrap_or_default()
}

fn titles(data: &KanbanData) -> Vec<&str> {
    data.columns
        .iter()
        .map(|column| column.title.as_str())
        .collect()
}

fn fixed_clock() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|date| date.and_hms_opt(12, 0, 0))
        .unwrap()
}

#[test]
fn select_values_fill_option_columns_in_option_order() {
    let input = input_with(documents(&[json!("Done"), json!("Done"), json!("In progress")]));
    let conversion = KanbanConverter::new().convert(&config_for(state_attribute()), &input);

    assert_eq!(
        titles(&conversion.data),
        vec!["Done", "In progress", "In Backlog"]
    );
    assert_eq!(card_ids(&conversion.data, "Done"), vec!["d0", "d1"]);
    assert_eq!(card_ids(&conversion.data, "In progress"), vec!["d2"]);
    assert!(card_ids(&conversion.data, "In Backlog").is_empty());
    assert!(conversion.data.other_column.cards.is_empty());
}

#[test]
fn empty_and_null_values_land_only_in_other_column() {
    let input = input_with(vec![
        DataResource::document("blank", "tasks").with_value("note", "   "),
        DataResource::document("null", "tasks").with_value("note", Value::Null),
        DataResource::document("missing", "tasks"),
        DataResource::document("zero", "tasks").with_value("note", 0),
        DataResource::document("no", "tasks").with_value("note", false),
    ]);
    let attribute = QueryResource::collection("tasks", 0).attribute("note");
    let conversion = KanbanConverter::new().convert(&config_for(attribute), &input);

    let other: Vec<&str> = conversion
        .data
        .other_column
        .cards
        .iter()
        .map(|card| card.data_resource.id.as_str())
        .collect();
    assert_eq!(other, vec!["blank", "null", "missing"]);
    assert_eq!(titles(&conversion.data), vec!["0", "false"]);
    assert_eq!(card_ids(&conversion.data, "0"), vec!["zero"]);
    assert_eq!(card_ids(&conversion.data, "false"), vec!["no"]);
}

#[test]
fn record_reached_through_several_links_appears_once() {
    let mut input = input_with(documents(&[json!("Done")]));
    input.collections.push(Collection::new("people", "People"));
    input.link_types.push(LinkType::new(
        "assigned",
        "Assigned",
        ["tasks".to_string(), "people".to_string()],
    ));
    input.data.data_by_stems[0].documents.extend([
        DataResource::document("p1", "people"),
        DataResource::document("p2", "people"),
    ]);
    input.data.data_by_stems[0].link_instances = vec![
        DataResource::link("l1", "assigned", ["d0", "p1"]),
        DataResource::link("l2", "assigned", ["d0", "p2"]),
    ];

    let config = KanbanConfig {
        stems_configs: vec![KanbanStemConfig::new(
            QueryStem::new("tasks").with_link_type("assigned"),
            state_attribute(),
        )],
        ..KanbanConfig::default()
    };
    let conversion = KanbanConverter::new().convert(&config, &input);

    assert_eq!(card_ids(&conversion.data, "Done"), vec!["d0"]);
}

#[test]
fn multi_select_duplicates_do_not_duplicate_cards() {
    let mut collection = tasks_collection();
    collection.attributes[0].constraint = Some(Constraint::Select(SelectConstraintConfig {
        multi: true,
        ..SelectConstraintConfig::with_options(["Done", "In progress", "In Backlog"])
    }));
    let mut input = input_with(documents(&[json!(["Done", "Done", "In progress"])]));
    input.collections = vec![collection];

    let conversion = KanbanConverter::new().convert(&config_for(state_attribute()), &input);

    assert_eq!(card_ids(&conversion.data, "Done"), vec!["d0"]);
    assert_eq!(card_ids(&conversion.data, "In progress"), vec!["d0"]);
}

#[test]
fn repeated_conversion_keeps_column_ids_and_config() {
    let input = input_with(documents(&[json!("Done"), json!("In progress")]));
    let mut converter = KanbanConverter::new();

    let first = converter.convert(&config_for(state_attribute()), &input);
    let second = converter.convert(&first.config, &input);
    assert_eq!(first.data, second.data);
    assert_eq!(first.config, second.config);

    // A fresh converter honors the persisted ids.
    let restored = KanbanConverter::new().convert(&first.config, &input);
    assert_eq!(restored.data, first.data);
}

#[test]
fn configured_column_ids_and_order_are_kept() {
    let input = input_with(documents(&[json!("Done"), json!("In progress")]));
    let mut config = config_for(state_attribute());
    config.columns = vec![
        KanbanColumn::new("col-progress", "In progress").with_attribute(state_attribute()),
        KanbanColumn::new("col-done", "Done").with_attribute(state_attribute()),
        KanbanColumn::new("col-dup", "Done").with_attribute(state_attribute()),
        KanbanColumn::new("col-archived", "Archived").with_attribute(state_attribute()),
    ];
    config.other_column = Some(KanbanColumn::new("col-other", ""));

    let conversion = KanbanConverter::new().convert(&config, &input);

    let ids: Vec<(&str, &str)> = conversion
        .data
        .columns
        .iter()
        .map(|column| (column.title.as_str(), column.id.as_str()))
        .collect();
    assert_eq!(ids[0], ("In progress", "col-progress"));
    assert_eq!(ids[1], ("Done", "col-done"));
    assert!(!titles(&conversion.data).contains(&"Archived"));
    assert_eq!(
        titles(&conversion.data)
            .iter()
            .filter(|title| **title == "Done")
            .count(),
        1
    );
    assert_eq!(conversion.data.other_column.id, "col-other");
}

#[test]
fn all_percentage_summaries_sum_to_one_hundred() {
    let input = input_with(vec![
        DataResource::document("d0", "tasks")
            .with_value("state", "Done")
            .with_value("points", 3),
        DataResource::document("d1", "tasks")
            .with_value("state", "Done")
            .with_value("points", 2),
        DataResource::document("d2", "tasks")
            .with_value("state", "In progress")
            .with_value("points", 5),
        DataResource::document("d3", "tasks").with_value("points", 10),
    ]);
    let mut config = config_for(state_attribute());
    config.stems_configs[0].aggregation =
        Some(QueryResource::collection("tasks", 0).attribute("points"));
    config.aggregation = Some(KanbanAggregation {
        aggregation: DataAggregationType::Sum,
        value_type: KanbanValueType::AllPercentage,
    });

    let conversion = KanbanConverter::new().convert(&config, &input);

    let summary = |title: &str| {
        conversion
            .data
            .columns
            .iter()
            .find(|column| column.title == title)
            .and_then(|column| column.summary.clone())
    };
    assert_eq!(summary("Done").as_deref(), Some("25.00%"));
    assert_eq!(summary("In progress").as_deref(), Some("25.00%"));
    assert_eq!(
        conversion.data.other_column.summary.as_deref(),
        Some("50.00%")
    );

    let total: f64 = conversion
        .data
        .all_columns()
        .filter_map(|column| column.summary.as_deref())
        .filter_map(|summary| summary.trim_end_matches('%').parse::<f64>().ok())
        .sum();
    assert!((total - 100.0).abs() < 0.05);
}

#[test]
fn count_summary_counts_cards_per_column() {
    let input = input_with(vec![
        DataResource::document("d0", "tasks")
            .with_value("state", "Done")
            .with_value("points", 3),
        DataResource::document("d1", "tasks")
            .with_value("state", "Done")
            .with_value("points", 2),
    ]);
    let mut config = config_for(state_attribute());
    config.stems_configs[0].aggregation =
        Some(QueryResource::collection("tasks", 0).attribute("points"));
    config.aggregation = Some(KanbanAggregation {
        aggregation: DataAggregationType::Count,
        value_type: KanbanValueType::Default,
    });

    let conversion = KanbanConverter::new().convert(&config, &input);

    let done = conversion
        .data
        .columns
        .iter()
        .find(|column| column.title == "Done")
        .unwrap();
    assert_eq!(done.summary.as_deref(), Some("2"));
}

#[test]
fn due_hours_are_measured_to_end_of_day_and_skipped_in_done_columns() {
    let input = input_with(vec![
        DataResource::document("open", "tasks")
            .with_value("state", "In progress")
            .with_value("due", "2024-01-02"),
        DataResource::document("finished", "tasks")
            .with_value("state", "Done")
            .with_value("due", "2024-01-02"),
    ]);
    let mut config = config_for(state_attribute());
    config.stems_configs[0].due_date = Some(QueryResource::collection("tasks", 0).attribute("due"));
    config.stems_configs[0].done_column_titles = vec!["Done".to_string()];

    let conversion = KanbanConverter::with_clock(fixed_clock).convert(&config, &input);

    let card = |title: &str| {
        conversion
            .data
            .columns
            .iter()
            .find(|column| column.title == title)
            .and_then(|column| column.cards.first())
            .cloned()
            .unwrap()
    };
    let open_hours = card("In progress").due_hours.unwrap();
    assert!((open_hours - 36.0).abs() < 0.001);
    assert_eq!(card("Done").due_hours, None);
}

#[test]
fn create_resources_follow_contribute_permission() {
    let mut input = input_with(documents(&[json!("Done")]));
    let config = config_for(state_attribute());

    let without = KanbanConverter::new().convert(&config, &input);
    assert!(without
        .data
        .all_columns()
        .all(|column| column.create_resources.is_empty()));

    input.permissions = ResourcesPermissions::default();
    input
        .permissions
        .collections
        .insert("tasks".to_string(), AllowedPermissions::contributor());
    let with = KanbanConverter::new().convert(&config, &input);

    for column in &with.data.columns {
        assert_eq!(column.create_resources.len(), 1, "column {}", column.title);
        assert_eq!(column.create_resources[0].resource_id, "tasks");
    }
    assert!(with.data.other_column.create_resources.is_empty());
}

#[test]
fn due_date_on_the_last_representable_day_has_no_due_hours() {
    let input = input_with(vec![DataResource::document("far", "tasks")
        .with_value("state", "In progress")
        .with_value("due", 8_210_266_876_799_999_i64)]);
    let mut config = config_for(state_attribute());
    config.stems_configs[0].due_date = Some(QueryResource::collection("tasks", 0).attribute("due"));

    let conversion = KanbanConverter::with_clock(fixed_clock).convert(&config, &input);

    assert_eq!(card_ids(&conversion.data, "In progress"), vec!["far"]);
    let card = conversion
        .data
        .columns
        .iter()
        .find(|column| column.title == "In progress")
        .and_then(|column| column.cards.first())
        .unwrap();
    assert_eq!(card.due_hours, None);
}

#[test]
fn columns_filled_only_by_stems_without_aggregation_have_no_summary() {
    let bugs = Collection::new("bugs", "Bugs").with_attribute(
        Attribute::new("state", "State").with_constraint(Constraint::Select(
            SelectConstraintConfig::with_options(["Done", "Later"]),
        )),
    );
    let mut input = input_with(vec![DataResource::document("t0", "tasks")
        .with_value("state", "Done")
        .with_value("points", 4)]);
    input.collections.push(bugs);
    input
        .data
        .data_by_stems
        .push(DocumentsAndLinksStemData {
            documents: vec![DataResource::document("b0", "bugs").with_value("state", "Later")],
            link_instances: Vec::new(),
        });

    let mut config = config_for(state_attribute());
    config.stems_configs[0].aggregation =
        Some(QueryResource::collection("tasks", 0).attribute("points"));
    config.stems_configs.push(KanbanStemConfig::new(
        QueryStem::new("bugs"),
        QueryResource::collection("bugs", 0).attribute("state"),
    ));
    config.aggregation = Some(KanbanAggregation {
        aggregation: DataAggregationType::Count,
        value_type: KanbanValueType::Default,
    });

    let conversion = KanbanConverter::new().convert(&config, &input);

    let summary = |title: &str| {
        conversion
            .data
            .columns
            .iter()
            .find(|column| column.title == title)
            .map(|column| column.summary.clone())
    };
    assert_eq!(card_ids(&conversion.data, "Later"), vec!["b0"]);
    assert_eq!(summary("Done"), Some(Some("1".to_string())));
    assert_eq!(summary("Later"), Some(None));
}

use lumeer_core::constraint::{Constraint, DateTimeConstraintConfig, SelectConstraintConfig};
use lumeer_core::db::open_db_in_memory;
use lumeer_core::gantt::{GanttChartConfig, GanttChartStemConfig};
use lumeer_core::kanban::{KanbanConfig, KanbanStemConfig};
use lumeer_core::model::data_resource::{
    DataResource, DocumentsAndLinksData, DocumentsAndLinksStemData,
};
use lumeer_core::model::input::PerspectiveInput;
use lumeer_core::model::query::{Query, QueryResource, QueryStem};
use lumeer_core::model::resource::{Attribute, Collection};
use lumeer_core::{
    Perspective, PerspectiveConfig, PerspectiveService, ServiceError, SqliteViewRepository,
    ViewRepository,
};
use uuid::Uuid;

fn input() -> PerspectiveInput {
    let date = Constraint::DateTime(DateTimeConstraintConfig::new("YYYY-MM-DD"));
    PerspectiveInput {
        collections: vec![Collection::new("tasks", "Tasks")
            .with_attribute(Attribute::new("state", "State").with_constraint(
                Constraint::Select(SelectConstraintConfig::with_options(["Todo", "Done"])),
            ))
            .with_attribute(Attribute::new("start", "Start").with_constraint(date.clone()))
            .with_attribute(Attribute::new("end", "End").with_constraint(date))],
        query: Query {
            stems: vec![QueryStem::new("tasks")],
        },
        data: DocumentsAndLinksData {
            data_by_stems: vec![DocumentsAndLinksStemData {
                documents: vec![
                    DataResource::document("d1", "tasks")
                        .with_value("state", "Done")
                        .with_value("start", "2024-01-02")
                        .with_value("end", "2024-01-03"),
                    DataResource::document("d2", "tasks")
                        .with_value("state", "Todo")
                        .with_value("start", "2024-01-01")
                        .with_value("end", "2024-01-05"),
                ],
                link_instances: Vec::new(),
            }],
        },
        ..PerspectiveInput::default()
    }
}

fn kanban_config() -> PerspectiveConfig {
    PerspectiveConfig::Kanban(KanbanConfig {
        stems_configs: vec![KanbanStemConfig::new(
            QueryStem::new("tasks"),
            QueryResource::collection("tasks", 0).attribute("state"),
        )],
        ..KanbanConfig::default()
    })
}

fn gantt_config() -> PerspectiveConfig {
    let resource = QueryResource::collection("tasks", 0);
    PerspectiveConfig::GanttChart(GanttChartConfig {
        stems_configs: vec![GanttChartStemConfig {
            stem: Some(QueryStem::new("tasks")),
            start: Some(resource.attribute("start")),
            end: Some(resource.attribute("end")),
            ..GanttChartStemConfig::default()
        }],
        ..GanttChartConfig::default()
    })
}

#[test]
fn render_kanban_persists_column_ids() {
    let conn = open_db_in_memory().unwrap();
    let mut service = PerspectiveService::new(SqliteViewRepository::new(&conn), "en");
    let id = service.create_view("Board", kanban_config()).unwrap();

    let first = service.render_kanban(id, &input()).unwrap();
    let stored = SqliteViewRepository::new(&conn).get_view(id).unwrap().unwrap();
    let PerspectiveConfig::Kanban(stored) = stored.config else {
        panic!("kanban view changed perspective");
    };
    let stored_ids: Vec<&str> = stored.columns.iter().map(|column| column.id.as_str()).collect();
    let rendered_ids: Vec<&str> = first.columns.iter().map(|column| column.id.as_str()).collect();
    assert_eq!(stored_ids, rendered_ids);

    // Column ids survive a fresh service reading the stored config.
    let mut restarted = PerspectiveService::new(SqliteViewRepository::new(&conn), "en");
    let second = restarted.render_kanban(id, &input()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn render_gantt_returns_ordered_tasks() {
    let conn = open_db_in_memory().unwrap();
    let mut service = PerspectiveService::new(SqliteViewRepository::new(&conn), "de");
    let id = service.create_view("Timeline", gantt_config()).unwrap();

    let conversion = service.render_gantt(id, &input(), true).unwrap();
    assert_eq!(conversion.options.language, "de");
    let starts: Vec<&str> = conversion.tasks.iter().map(|task| task.start.as_str()).collect();
    assert_eq!(starts, vec!["2024-01-01 00:00", "2024-01-02 00:00"]);

    service.reset_gantt_sort(id);
    let again = service.render_gantt(id, &input(), true).unwrap();
    assert!(!again.sort_changed);
}

#[test]
fn rendering_with_wrong_perspective_fails() {
    let conn = open_db_in_memory().unwrap();
    let mut service = PerspectiveService::new(SqliteViewRepository::new(&conn), "en");
    let id = service.create_view("Timeline", gantt_config()).unwrap();

    let err = service.render_kanban(id, &input()).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::PerspectiveMismatch {
            expected: Perspective::Kanban,
            actual: Perspective::GanttChart,
            ..
        }
    ));
}

#[test]
fn unknown_view_is_reported() {
    let conn = open_db_in_memory().unwrap();
    let mut service = PerspectiveService::new(SqliteViewRepository::new(&conn), "en");
    let id = Uuid::new_v4();

    assert!(matches!(
        service.render_gantt(id, &input(), true).unwrap_err(),
        ServiceError::ViewNotFound(missing) if missing == id
    ));
}

#[test]
fn delete_view_forgets_converter_state() {
    let conn = open_db_in_memory().unwrap();
    let mut service = PerspectiveService::new(SqliteViewRepository::new(&conn), "en");
    let id = service.create_view("Board", kanban_config()).unwrap();
    service.render_kanban(id, &input()).unwrap();

    service.delete_view(id).unwrap();
    assert!(service.list_views(None).unwrap().is_empty());
    assert!(matches!(
        service.render_kanban(id, &input()).unwrap_err(),
        ServiceError::ViewNotFound(_)
    ));
}

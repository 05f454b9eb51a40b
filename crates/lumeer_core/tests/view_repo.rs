use lumeer_core::db::{open_db, open_db_in_memory};
use lumeer_core::gantt::GanttChartConfig;
use lumeer_core::kanban::{KanbanColumn, KanbanConfig};
use lumeer_core::{
    Perspective, PerspectiveConfig, RepoError, SqliteViewRepository, View, ViewRepository,
    ViewValidationError,
};
use uuid::Uuid;

fn kanban_view(name: &str) -> View {
    View::new(name, PerspectiveConfig::Kanban(KanbanConfig::default()))
}

fn gantt_view(name: &str) -> View {
    View::new(
        name,
        PerspectiveConfig::GanttChart(GanttChartConfig::default()),
    )
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteViewRepository::new(&conn);

    let view = kanban_view("Sprint board");
    let id = repo.create_view(&view).unwrap();

    let loaded = repo.get_view(id).unwrap().unwrap();
    assert_eq!(loaded, view);
    assert_eq!(loaded.perspective(), Perspective::Kanban);
}

#[test]
fn get_missing_view_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteViewRepository::new(&conn);

    assert!(repo.get_view(Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn create_rejects_invalid_view() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteViewRepository::new(&conn);

    let err = repo.create_view(&kanban_view("   ")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ViewValidationError::BlankName)
    ));
}

#[test]
fn update_config_replaces_columns() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteViewRepository::new(&conn);
    let id = repo.create_view(&kanban_view("Board")).unwrap();

    let updated = PerspectiveConfig::Kanban(KanbanConfig {
        columns: vec![KanbanColumn::new("col-1", "Done")],
        ..KanbanConfig::default()
    });
    repo.update_view_config(id, &updated).unwrap();

    let loaded = repo.get_view(id).unwrap().unwrap();
    assert_eq!(loaded.config, updated);
}

#[test]
fn update_missing_view_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteViewRepository::new(&conn);
    let id = Uuid::new_v4();

    let err = repo
        .update_view_config(id, &PerspectiveConfig::Kanban(KanbanConfig::default()))
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(missing) if missing == id));
}

#[test]
fn list_filters_by_perspective() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteViewRepository::new(&conn);
    let board = repo.create_view(&kanban_view("Board")).unwrap();
    let chart = repo.create_view(&gantt_view("Timeline")).unwrap();

    let all = repo.list_views(None).unwrap();
    assert_eq!(all.len(), 2);

    let charts = repo.list_views(Some(Perspective::GanttChart)).unwrap();
    assert_eq!(charts.len(), 1);
    assert_eq!(charts[0].uuid, chart);

    let boards = repo.list_views(Some(Perspective::Kanban)).unwrap();
    assert_eq!(boards.len(), 1);
    assert_eq!(boards[0].uuid, board);
}

#[test]
fn delete_removes_view() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteViewRepository::new(&conn);
    let id = repo.create_view(&kanban_view("Board")).unwrap();

    repo.delete_view(id).unwrap();
    assert!(repo.get_view(id).unwrap().is_none());
    assert!(matches!(
        repo.delete_view(id).unwrap_err(),
        RepoError::NotFound(_)
    ));
}

#[test]
fn corrupted_config_is_rejected_on_read() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteViewRepository::new(&conn);
    let id = repo.create_view(&kanban_view("Board")).unwrap();

    conn.execute(
        "UPDATE views SET config_json = '{\"columns\": 5}' WHERE view_uuid = ?1;",
        [id.to_string()],
    )
    .unwrap();

    assert!(matches!(
        repo.get_view(id).unwrap_err(),
        RepoError::InvalidData(_)
    ));
}

#[test]
fn views_survive_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("views.db");

    let id = {
        let conn = open_db(&path).unwrap();
        let repo = SqliteViewRepository::new(&conn);
        repo.create_view(&gantt_view("Timeline")).unwrap()
    };

    let conn = open_db(&path).unwrap();
    let repo = SqliteViewRepository::new(&conn);
    let loaded = repo.get_view(id).unwrap().unwrap();
    assert_eq!(loaded.name, "Timeline");
    assert_eq!(loaded.perspective(), Perspective::GanttChart);
}

//! Core perspective logic for Lumeer boards and charts.
//! Converts query results into Kanban columns and Gantt tasks, and keeps the
//! saved views those perspectives render.

pub mod aggregation;
pub mod constraint;
pub mod db;
pub mod gantt;
pub mod kanban;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod util;

pub use db::{open_db, open_db_in_memory, DbError};
pub use gantt::{GanttChartConfig, GanttChartConverter, GanttConversion, GanttTask};
pub use kanban::{KanbanConfig, KanbanConversion, KanbanConverter, KanbanData};
pub use logging::{
    default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget,
};
pub use model::input::PerspectiveInput;
pub use model::view::{Perspective, PerspectiveConfig, View, ViewId, ViewValidationError};
pub use repo::view_repo::{RepoError, RepoResult, SqliteViewRepository, ViewRepository};
pub use service::perspective_service::{PerspectiveService, ServiceError, ServiceResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

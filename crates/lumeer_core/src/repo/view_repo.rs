//! View repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over the `views` table.
//! - Keep SQL and JSON encoding details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths must call `View::validate()` before SQL mutations.
//! - Read paths must reject rows whose uuid, perspective or config cannot be
//!   decoded instead of masking them.
//! - `perspective` column always matches the variant stored in `config_json`.

use crate::db::DbError;
use crate::gantt::GanttChartConfig;
use crate::kanban::KanbanConfig;
use crate::model::view::{Perspective, PerspectiveConfig, View, ViewId, ViewValidationError};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const VIEW_SELECT_SQL: &str = "SELECT
    view_uuid,
    name,
    perspective,
    config_json,
    updated_at
FROM views";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for view persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ViewValidationError),
    Db(DbError),
    NotFound(ViewId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "view not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted view data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ViewValidationError> for RepoError {
    fn from(value: ViewValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for saved views.
pub trait ViewRepository {
    fn create_view(&self, view: &View) -> RepoResult<ViewId>;
    /// Replaces the stored config and bumps `updated_at`.
    fn update_view_config(&self, id: ViewId, config: &PerspectiveConfig) -> RepoResult<()>;
    fn get_view(&self, id: ViewId) -> RepoResult<Option<View>>;
    /// Lists views, newest first, optionally narrowed to one perspective.
    fn list_views(&self, perspective: Option<Perspective>) -> RepoResult<Vec<View>>;
    fn delete_view(&self, id: ViewId) -> RepoResult<()>;
}

/// SQLite-backed view repository.
pub struct SqliteViewRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteViewRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ViewRepository for SqliteViewRepository<'_> {
    fn create_view(&self, view: &View) -> RepoResult<ViewId> {
        view.validate()?;
        let config_json = encode_config(&view.config)?;

        self.conn.execute(
            "INSERT INTO views (
                view_uuid,
                name,
                perspective,
                config_json,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                view.uuid.to_string(),
                view.name.trim(),
                view.perspective().as_str(),
                config_json,
                view.updated_at,
            ],
        )?;

        Ok(view.uuid)
    }

    fn update_view_config(&self, id: ViewId, config: &PerspectiveConfig) -> RepoResult<()> {
        if id.is_nil() {
            return Err(ViewValidationError::NilUuid.into());
        }
        let config_json = encode_config(config)?;

        let changed = self.conn.execute(
            "UPDATE views
             SET
                perspective = ?2,
                config_json = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE view_uuid = ?1;",
            params![id.to_string(), config.perspective().as_str(), config_json],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn get_view(&self, id: ViewId) -> RepoResult<Option<View>> {
        let sql = format!("{VIEW_SELECT_SQL} WHERE view_uuid = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id.to_string()])?;

        match rows.next()? {
            Some(row) => Ok(Some(parse_view_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_views(&self, perspective: Option<Perspective>) -> RepoResult<Vec<View>> {
        let mut sql = format!("{VIEW_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values = Vec::new();

        if let Some(perspective) = perspective {
            sql.push_str(" AND perspective = ?");
            bind_values.push(Value::Text(perspective.as_str().to_string()));
        }

        sql.push_str(" ORDER BY updated_at DESC, view_uuid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut views = Vec::new();

        while let Some(row) = rows.next()? {
            views.push(parse_view_row(row)?);
        }

        Ok(views)
    }

    fn delete_view(&self, id: ViewId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM views WHERE view_uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn encode_config(config: &PerspectiveConfig) -> RepoResult<String> {
    let encoded = match config {
        PerspectiveConfig::Kanban(config) => serde_json::to_string(config),
        PerspectiveConfig::GanttChart(config) => serde_json::to_string(config),
    };
    encoded.map_err(|err| RepoError::InvalidData(format!("cannot encode view config: {err}")))
}

fn decode_config(perspective: Perspective, json: &str) -> RepoResult<PerspectiveConfig> {
    let decoded = match perspective {
        Perspective::Kanban => {
            serde_json::from_str::<KanbanConfig>(json).map(PerspectiveConfig::Kanban)
        }
        Perspective::GanttChart => {
            serde_json::from_str::<GanttChartConfig>(json).map(PerspectiveConfig::GanttChart)
        }
    };
    decoded.map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid {perspective} config in views.config_json: {err}"
        ))
    })
}

fn parse_view_row(row: &Row<'_>) -> RepoResult<View> {
    let uuid_text: String = row.get("view_uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in views.view_uuid"))
    })?;

    let perspective_text: String = row.get("perspective")?;
    let perspective = Perspective::parse(&perspective_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid perspective `{perspective_text}` in views.perspective"
        ))
    })?;

    let config_json: String = row.get("config_json")?;
    let config = decode_config(perspective, &config_json)?;

    let view = View {
        uuid,
        name: row.get("name")?,
        config,
        updated_at: row.get("updated_at")?,
    };
    view.validate()?;
    Ok(view)
}

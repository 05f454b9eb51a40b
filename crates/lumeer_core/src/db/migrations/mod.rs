//! Schema steps of the views database.
//!
//! Each step is applied once, in version order, inside a single transaction,
//! and stamps `PRAGMA user_version`. A database stamped with a version this
//! binary does not know is left untouched.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct ViewsMigration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const VIEWS_MIGRATIONS: &[ViewsMigration] = &[
    ViewsMigration {
        version: 1,
        name: "views",
        sql: include_str!("0001_views.sql"),
    },
    ViewsMigration {
        version: 2,
        name: "views_by_perspective",
        sql: include_str!("0002_views_by_perspective.sql"),
    },
];

/// Latest schema version of the views database.
pub fn latest_version() -> u32 {
    VIEWS_MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings the views schema up to [`latest_version`].
///
/// Returns the names of the steps applied by this call, oldest first.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<Vec<&'static str>> {
    let current = current_user_version(conn)?;
    let latest = latest_version();
    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }

    let pending: Vec<&ViewsMigration> = VIEWS_MIGRATIONS
        .iter()
        .filter(|migration| migration.version > current)
        .collect();
    if pending.is_empty() {
        return Ok(Vec::new());
    }

    let tx = conn.transaction()?;
    for migration in &pending {
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
    }
    tx.commit()?;

    for migration in &pending {
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    Ok(pending.iter().map(|migration| migration.name).collect())
}

pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?)
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, current_user_version, latest_version};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn fresh_database_gets_every_step_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(
            apply_migrations(&mut conn).unwrap(),
            vec!["views", "views_by_perspective"]
        );
        assert!(apply_migrations(&mut conn).unwrap().is_empty());
        assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn only_missing_steps_run_on_older_schema() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(include_str!("0001_views.sql")).unwrap();
        conn.pragma_update(None, "user_version", 1).unwrap();

        assert_eq!(
            apply_migrations(&mut conn).unwrap(),
            vec!["views_by_perspective"]
        );
        let index_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'index' AND name = 'idx_views_perspective_updated';",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(index_count, 1);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", latest_version() + 1)
            .unwrap();
        let err = apply_migrations(&mut conn).unwrap_err();
        assert!(matches!(err, DbError::UnsupportedSchemaVersion { .. }));
    }
}

//! SQLite schema for the equivalence store and its migration runner.
//!
//! Migrations are applied in order; the SQLite `user_version` pragma records
//! the last one applied.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::errors::DatabaseError;

/// `(version, description, sql)`, versions starting at 1.
///
/// Rows are stored with the smaller revision (by `Revision` ordering) in the
/// `rev1` columns so a pair has exactly one row whichever way it was noted.
static MIGRATIONS: &[(u32, &str, &str)] = &[
    (
        1,
        "equivalences table",
        r#"
        CREATE TABLE IF NOT EXISTS equivalences (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            rev1_repo   TEXT NOT NULL,
            rev1_id     TEXT NOT NULL,
            rev2_repo   TEXT NOT NULL,
            rev2_id     TEXT NOT NULL,
            noted_at    TEXT NOT NULL,
            CHECK (rev1_repo <> rev2_repo),
            UNIQUE (rev1_repo, rev1_id, rev2_repo, rev2_id)
        );
        "#,
    ),
    (
        2,
        "lookup indexes",
        r#"
        CREATE INDEX IF NOT EXISTS idx_equivalences_rev1 ON equivalences (rev1_repo, rev1_id);
        CREATE INDEX IF NOT EXISTS idx_equivalences_rev2 ON equivalences (rev2_repo, rev2_id);
        "#,
    ),
];

/// Run all pending migrations against `conn`.
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = schema_version(conn)?;
    info!(
        current_version,
        target_version = MIGRATIONS.last().map(|m| m.0).unwrap_or(0),
        "checking equivalence store migrations"
    );

    for &(version, description, sql) in MIGRATIONS {
        if version <= current_version {
            continue;
        }
        info!(version, description, "applying migration");
        conn.execute_batch(sql)
            .map_err(|e| DatabaseError::MigrationFailed {
                version,
                detail: e.to_string(),
            })?;
        conn.pragma_update(None, "user_version", version)?;
        debug!(version, "migration applied");
    }
    Ok(())
}

/// The `user_version` pragma.
pub fn schema_version(conn: &Connection) -> Result<u32, DatabaseError> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_run_idempotently() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 2);
    }

    #[test]
    fn test_same_repository_pair_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO equivalences (rev1_repo, rev1_id, rev2_repo, rev2_id, noted_at)
             VALUES ('a', '1', 'a', '2', 'now')",
            [],
        );
        assert!(result.is_err());
    }
}

//! SQLite-backed equivalence database.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::{debug, info, warn};

use super::{schema, Db, Equivalence};
use crate::errors::DatabaseError;
use crate::models::Revision;

/// Equivalence store in a SQLite file, opened in WAL mode.
///
/// The connection sits behind a `Mutex` so the handle is `Send + Sync`.
pub struct SqliteDb {
    conn: Mutex<Connection>,
}

impl SqliteDb {
    /// Open (or create) the database at `path`. Call
    /// [`initialize`](Self::initialize) before use.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening sqlite equivalence store");
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    /// Bring the schema up to date.
    pub fn initialize(&self) -> Result<(), DatabaseError> {
        schema::run_migrations(&self.conn())
    }

    /// Lock the connection, recovering from a poisoned mutex.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("sqlite mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

fn revision_from_columns(row: &rusqlite::Row<'_>, repo: usize, id: usize) -> rusqlite::Result<Revision> {
    Ok(Revision::new(row.get::<_, String>(id)?, row.get::<_, String>(repo)?))
}

impl Db for SqliteDb {
    fn find_equivalences(
        &self,
        revision: &Revision,
        other_repository: &str,
    ) -> Result<Vec<Revision>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT CASE WHEN rev1_repo = ?1 AND rev1_id = ?2 THEN rev2_id ELSE rev1_id END
             FROM equivalences
             WHERE (rev1_repo = ?1 AND rev1_id = ?2 AND rev2_repo = ?3)
                OR (rev2_repo = ?1 AND rev2_id = ?2 AND rev1_repo = ?3)
             ORDER BY id",
        )?;
        let found = stmt
            .query_map(
                params![revision.repository_name, revision.rev_id, other_repository],
                |row| row.get::<_, String>(0),
            )?
            .map(|id| id.map(|id| Revision::new(id, other_repository)))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(%revision, other_repository, count = found.len(), "sqlite equivalence lookup");
        Ok(found)
    }

    fn note_equivalence(&mut self, equivalence: Equivalence) -> Result<(), DatabaseError> {
        let (low, high) = if equivalence.rev1() <= equivalence.rev2() {
            (equivalence.rev1(), equivalence.rev2())
        } else {
            (equivalence.rev2(), equivalence.rev1())
        };
        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO equivalences (rev1_repo, rev1_id, rev2_repo, rev2_id, noted_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                low.repository_name,
                low.rev_id,
                high.repository_name,
                high.rev_id,
                Utc::now().to_rfc3339()
            ],
        )?;
        debug!(%equivalence, inserted, "noted equivalence");
        Ok(())
    }

    fn equivalences(&self) -> Result<Vec<Equivalence>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT rev1_repo, rev1_id, rev2_repo, rev2_id FROM equivalences ORDER BY id",
        )?;
        let pairs = stmt
            .query_map([], |row| {
                Ok((
                    revision_from_columns(row, 0, 1)?,
                    revision_from_columns(row, 2, 3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        pairs
            .into_iter()
            .map(|(rev1, rev2)| Equivalence::new(rev1, rev2))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equivalence(a: (&str, &str), b: (&str, &str)) -> Equivalence {
        Equivalence::new(Revision::new(a.0, a.1), Revision::new(b.0, b.1)).unwrap()
    }

    #[test]
    fn test_lookup_is_symmetric_and_deduplicated() {
        let mut db = SqliteDb::in_memory().unwrap();
        db.initialize().unwrap();
        db.note_equivalence(equivalence(("1002", "repo1"), ("2", "repo2"))).unwrap();
        db.note_equivalence(equivalence(("2", "repo2"), ("1002", "repo1"))).unwrap();
        db.note_equivalence(equivalence(("1002", "repo1"), ("9", "repo3"))).unwrap();

        assert_eq!(db.equivalences().unwrap().len(), 2);
        assert_eq!(
            db.find_equivalences(&Revision::new("1002", "repo1"), "repo2").unwrap(),
            vec![Revision::new("2", "repo2")]
        );
        assert_eq!(
            db.find_equivalences(&Revision::new("2", "repo2"), "repo1").unwrap(),
            vec![Revision::new("1002", "repo1")]
        );
        assert!(db
            .find_equivalences(&Revision::new("2", "repo2"), "repo3")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("equivalences.db");
        {
            let mut db = SqliteDb::new(&path).unwrap();
            db.initialize().unwrap();
            db.note_equivalence(equivalence(("a", "internal"), ("b", "public"))).unwrap();
        }
        let db = SqliteDb::new(&path).unwrap();
        db.initialize().unwrap();
        assert_eq!(
            db.equivalences().unwrap(),
            vec![equivalence(("b", "public"), ("a", "internal"))]
        );
    }
}

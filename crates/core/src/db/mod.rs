//! Equivalence database for equisync.
//!
//! An [`Equivalence`] asserts that a revision in one repository and a
//! revision in another represent the same logical codebase state. A [`Db`]
//! stores them and answers "what is X in repository R equivalent to in
//! repository R2" symmetrically. Two backends exist: a JSON text file
//! ([`FileDb`]) and a SQLite database ([`SqliteDb`]).

pub mod file;
pub mod schema;
pub mod sqlite;

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{DatabaseConfig, DatabaseFormat};
use crate::errors::DatabaseError;
use crate::models::Revision;

pub use file::FileDb;
pub use sqlite::SqliteDb;

// ---------------------------------------------------------------------------
// Equivalence
// ---------------------------------------------------------------------------

/// Unordered pair of revisions from two different repositories.
///
/// `Equivalence::new(a, b) == Equivalence::new(b, a)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "StoredEquivalence", into = "StoredEquivalence")]
pub struct Equivalence {
    rev1: Revision,
    rev2: Revision,
}

/// Persisted shape of an [`Equivalence`]: `{"rev1": {..}, "rev2": {..}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEquivalence {
    rev1: Revision,
    rev2: Revision,
}

impl Equivalence {
    /// Pair two revisions. Fails when both are in the same repository.
    pub fn new(rev1: Revision, rev2: Revision) -> Result<Self, DatabaseError> {
        if rev1.repository_name == rev2.repository_name {
            return Err(DatabaseError::InvalidEquivalence(rev1.repository_name));
        }
        Ok(Self { rev1, rev2 })
    }

    pub fn rev1(&self) -> &Revision {
        &self.rev1
    }

    pub fn rev2(&self) -> &Revision {
        &self.rev2
    }

    /// The side of the pair that is not `revision`, if `revision` is a side.
    pub fn other_revision(&self, revision: &Revision) -> Option<&Revision> {
        if self.rev1 == *revision {
            Some(&self.rev2)
        } else if self.rev2 == *revision {
            Some(&self.rev1)
        } else {
            None
        }
    }

    /// Both sides, smaller first.
    fn ordered(&self) -> (&Revision, &Revision) {
        if self.rev1 <= self.rev2 {
            (&self.rev1, &self.rev2)
        } else {
            (&self.rev2, &self.rev1)
        }
    }
}

impl PartialEq for Equivalence {
    fn eq(&self, other: &Self) -> bool {
        self.ordered() == other.ordered()
    }
}

impl Eq for Equivalence {}

impl Hash for Equivalence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ordered().hash(state);
    }
}

impl fmt::Display for Equivalence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} == {}", self.rev1, self.rev2)
    }
}

impl TryFrom<StoredEquivalence> for Equivalence {
    type Error = DatabaseError;

    fn try_from(stored: StoredEquivalence) -> Result<Self, Self::Error> {
        Equivalence::new(stored.rev1, stored.rev2)
    }
}

impl From<Equivalence> for StoredEquivalence {
    fn from(eq: Equivalence) -> Self {
        Self {
            rev1: eq.rev1,
            rev2: eq.rev2,
        }
    }
}

// ---------------------------------------------------------------------------
// Database capability
// ---------------------------------------------------------------------------

/// A store of known equivalences.
pub trait Db {
    /// Revisions in `other_repository` asserted equivalent to `revision`,
    /// in the order they were noted.
    fn find_equivalences(
        &self,
        revision: &Revision,
        other_repository: &str,
    ) -> Result<Vec<Revision>, DatabaseError>;

    /// Record an equivalence. Noting a known pair again is a no-op.
    fn note_equivalence(&mut self, equivalence: Equivalence) -> Result<(), DatabaseError>;

    /// Every stored equivalence, in the order it was noted.
    fn equivalences(&self) -> Result<Vec<Equivalence>, DatabaseError>;
}

/// Open the database described by `config`.
pub fn open_database(config: &DatabaseConfig) -> Result<Box<dyn Db>, DatabaseError> {
    info!(path = %config.path.display(), format = ?config.format, "opening equivalence database");
    Ok(match config.format {
        DatabaseFormat::Json => Box::new(FileDb::open(&config.path)?),
        DatabaseFormat::Sqlite => {
            let db = SqliteDb::new(&config.path)?;
            db.initialize()?;
            Box::new(db)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equivalence_is_unordered() {
        let a = Revision::new("1002", "repo1");
        let b = Revision::new("2", "repo2");
        let forward = Equivalence::new(a.clone(), b.clone()).unwrap();
        let backward = Equivalence::new(b.clone(), a.clone()).unwrap();
        assert_eq!(forward, backward);

        let set: HashSet<_> = [forward.clone(), backward].into_iter().collect();
        assert_eq!(set.len(), 1);

        assert_eq!(forward.other_revision(&a), Some(&b));
        assert_eq!(forward.other_revision(&b), Some(&a));
        assert_eq!(forward.other_revision(&Revision::new("2", "repo1")), None);
    }

    #[test]
    fn test_equivalence_requires_two_repositories() {
        let err = Equivalence::new(Revision::new("1", "repo1"), Revision::new("2", "repo1"))
            .unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEquivalence(ref r) if r == "repo1"));
    }

    #[test]
    fn test_equivalence_json_shape() {
        let eq: Equivalence = serde_json::from_str(
            r#"{"rev1": {"revId":"1002","repositoryName":"repo1"},
                "rev2": {"revId":"2","repositoryName":"repo2"}}"#,
        )
        .unwrap();
        assert_eq!(eq.rev1(), &Revision::new("1002", "repo1"));

        let bad: Result<Equivalence, _> = serde_json::from_str(
            r#"{"rev1": {"revId":"1","repositoryName":"r"},
                "rev2": {"revId":"2","repositoryName":"r"}}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_open_database_by_format() {
        let dir = tempfile::tempdir().unwrap();
        for (format, file) in [(DatabaseFormat::Json, "db.json"), (DatabaseFormat::Sqlite, "db.sqlite")] {
            let config = DatabaseConfig {
                path: dir.path().join(file),
                format,
            };
            let mut db = open_database(&config).unwrap();
            db.note_equivalence(
                Equivalence::new(Revision::new("a", "internal"), Revision::new("b", "public"))
                    .unwrap(),
            )
            .unwrap();
            assert_eq!(
                db.find_equivalences(&Revision::new("b", "public"), "internal").unwrap(),
                vec![Revision::new("a", "internal")]
            );
        }
    }
}

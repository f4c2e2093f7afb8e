//! Matching revision walks against the equivalence database.

use tracing::debug;

use crate::db::{Db, Equivalence};
use crate::errors::RepositoryError;
use crate::history::{RevisionGraph, RevisionMatcher};
use crate::models::Revision;

/// Stops a walk at revisions that have a known equivalent in
/// `other_repository`.
pub struct EquivalenceMatcher<'a> {
    other_repository: String,
    db: &'a dyn Db,
}

impl<'a> EquivalenceMatcher<'a> {
    pub fn new(other_repository: impl Into<String>, db: &'a dyn Db) -> Self {
        Self {
            other_repository: other_repository.into(),
            db,
        }
    }

    pub fn other_repository(&self) -> &str {
        &self.other_repository
    }
}

impl RevisionMatcher for EquivalenceMatcher<'_> {
    type Output = EquivalenceMatchResult;

    fn matches(&self, revision: &Revision) -> Result<bool, RepositoryError> {
        Ok(!self
            .db
            .find_equivalences(revision, &self.other_repository)?
            .is_empty())
    }

    fn make_result(
        &self,
        graph: RevisionGraph,
        matching: Vec<Revision>,
    ) -> Result<EquivalenceMatchResult, RepositoryError> {
        let mut equivalences: Vec<Equivalence> = Vec::new();
        for revision in matching {
            for other in self.db.find_equivalences(&revision, &self.other_repository)? {
                let equivalence = Equivalence::new(revision.clone(), other)?;
                if !equivalences.contains(&equivalence) {
                    debug!(%equivalence, other_repository = self.other_repository(), "found equivalence");
                    equivalences.push(equivalence);
                }
            }
        }
        Ok(EquivalenceMatchResult {
            equivalences,
            revisions_since_equivalence: graph,
        })
    }
}

/// Outcome of an equivalence walk: the equivalences reached and every
/// revision visited on the way that had none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquivalenceMatchResult {
    equivalences: Vec<Equivalence>,
    revisions_since_equivalence: RevisionGraph,
}

impl EquivalenceMatchResult {
    /// Equivalences in discovery order, each once.
    pub fn equivalences(&self) -> &[Equivalence] {
        &self.equivalences
    }

    pub fn revisions_since_equivalence(&self) -> &RevisionGraph {
        &self.revisions_since_equivalence
    }

    /// Consume the result.
    pub fn into_parts(self) -> (Vec<Equivalence>, RevisionGraph) {
        (self.equivalences, self.revisions_since_equivalence)
    }
}

//! Domain model types used throughout equisync.
//!
//! These types bridge the per-VCS revision histories, the equivalence
//! database and the revision search.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Revision
// ---------------------------------------------------------------------------

/// A single commit, scoped to one named repository.
///
/// Identity is the `(rev_id, repository_name)` pair: the same bare id in two
/// repositories names two different revisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub rev_id: String,
    pub repository_name: String,
}

impl Revision {
    pub fn new(rev_id: impl Into<String>, repository_name: impl Into<String>) -> Self {
        Self {
            rev_id: rev_id.into(),
            repository_name: repository_name.into(),
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{{}}}", self.repository_name, self.rev_id)
    }
}

// ---------------------------------------------------------------------------
// Revision metadata
// ---------------------------------------------------------------------------

/// Separator placed between descriptions when several records are merged.
pub const DESCRIPTION_DELIMITER: &str = "\n-------------\n";

/// A parsed commit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionMetadata {
    pub id: String,
    pub author: String,
    pub date: DateTime<FixedOffset>,
    pub description: String,
    /// Parents in the order the VCS reported them; the first is the mainline.
    pub parents: Vec<Revision>,
}

impl RevisionMetadata {
    /// Summarize a range of revisions as one synthetic record.
    ///
    /// Ids and authors are joined with `", "`, descriptions with
    /// [`DESCRIPTION_DELIMITER`], the latest date wins and every parent is
    /// kept in order. Returns `None` for an empty slice.
    pub fn concatenate(records: &[RevisionMetadata]) -> Option<RevisionMetadata> {
        let latest = records.iter().map(|rm| rm.date).max()?;
        Some(RevisionMetadata {
            id: join(records, |rm| rm.id.as_str(), ", "),
            author: join(records, |rm| rm.author.as_str(), ", "),
            date: latest,
            description: join(records, |rm| rm.description.as_str(), DESCRIPTION_DELIMITER),
            parents: records
                .iter()
                .flat_map(|rm| rm.parents.iter().cloned())
                .collect(),
        })
    }
}

fn join<'a>(
    records: &'a [RevisionMetadata],
    field: impl Fn(&'a RevisionMetadata) -> &'a str,
    separator: &str,
) -> String {
    records.iter().map(field).collect::<Vec<_>>().join(separator)
}

impl fmt::Display for RevisionMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parents = self
            .parents
            .iter()
            .map(|p| p.rev_id.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "id: {}\nauthor: {}\ndate: {}\ndescription: {}\nparents: {}",
            self.id,
            self.author,
            self.date.to_rfc3339(),
            self.description,
            parents
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(id: &str, hour: u32) -> RevisionMetadata {
        let date = DateTime::parse_from_rfc3339(&format!("2012-07-09T{hour:02}:00:00-07:00"))
            .unwrap();
        RevisionMetadata {
            id: id.into(),
            author: "author".into(),
            date,
            description: "description".into(),
            parents: vec![Revision::new("parent", "internal")],
        }
    }

    #[test]
    fn test_revision_identity_is_repository_scoped() {
        let a = Revision::new("1", "internal");
        let b = Revision::new("1", "public");
        assert_ne!(a, b);
        assert_eq!(a, Revision::new("1", "internal"));
        assert_eq!(a.to_string(), "internal{1}");
    }

    #[test]
    fn test_revision_json_field_names() {
        let rev: Revision =
            serde_json::from_str(r#"{"revId":"1002","repositoryName":"repo1"}"#).unwrap();
        assert_eq!(rev, Revision::new("1002", "repo1"));
    }

    #[test]
    fn test_concatenate_joins_fields() {
        let merged = RevisionMetadata::concatenate(&[metadata("1", 6), metadata("2", 9)]).unwrap();
        assert_eq!(merged.id, "1, 2");
        assert_eq!(merged.author, "author, author");
        assert_eq!(merged.description, "description\n-------------\ndescription");
        assert_eq!(merged.date, metadata("2", 9).date);
        assert_eq!(
            merged.parents,
            vec![
                Revision::new("parent", "internal"),
                Revision::new("parent", "internal"),
            ]
        );
    }

    #[test]
    fn test_concatenate_single_record_is_identity() {
        let one = metadata("7", 6);
        assert_eq!(RevisionMetadata::concatenate(&[one.clone()]), Some(one));
        assert_eq!(RevisionMetadata::concatenate(&[]), None);
    }
}

//! Parsers for `git` command output.

use chrono::DateTime;
use tracing::debug;

use crate::errors::RepositoryError;
use crate::models::{Revision, RevisionMetadata};

/// `git log --format` producing NUL-separated id, author, date, parents and
/// the raw body. The body goes last because it is the only free-form field.
pub const METADATA_FORMAT: &str = "%H%x00%an <%ae>%x00%ad%x00%P%x00%B";

/// Parse one record of [`METADATA_FORMAT`] output (with `--date=iso-strict`).
pub fn parse_log_record(raw: &str, repository_name: &str) -> Result<RevisionMetadata, RepositoryError> {
    let fields: Vec<&str> = raw.splitn(5, '\0').collect();
    let [id, author, date, parents, body] = fields[..] else {
        return Err(RepositoryError::malformed(
            raw,
            format!("expected 5 NUL-separated fields, found {}", fields.len()),
        ));
    };

    let date = DateTime::parse_from_rfc3339(date.trim())
        .map_err(|e| RepositoryError::malformed(raw, format!("unparseable date {date:?}: {e}")))?;

    let metadata = RevisionMetadata {
        id: id.trim().to_string(),
        author: author.to_string(),
        date,
        description: body.trim_end().to_string(),
        parents: parents
            .split_whitespace()
            .map(|p| Revision::new(p, repository_name))
            .collect(),
    };
    debug!(id = %metadata.id, parents = metadata.parents.len(), "parsed git metadata");
    Ok(metadata)
}

/// Rewrite `refs/remotes/origin/*` short names to plain branch names so
/// local and remote-tracking refs of one branch share a name.
pub fn normalize_ref_listing(output: &str) -> String {
    output
        .lines()
        .map(|line| match line.split_once(' ') {
            Some((sha, name)) => {
                let name = name.strip_prefix("origin/").unwrap_or(name);
                format!("{sha} {name}")
            }
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

//! Parsers for `hg` template output.

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::errors::RepositoryError;
use crate::models::{Revision, RevisionMetadata};

/// Separator between the fields of [`METADATA_TEMPLATE`].
pub const FIELD_SEPARATOR: &str = " < ";

/// `hg log` template producing one line per changeset:
/// id, author, date, description and parents, all escaped.
pub const METADATA_TEMPLATE: &str = "{node|escape} < {author|escape} < \
                                     {date|isodate|escape} < {desc|escape} < \
                                     {parents|stringify|escape}";

/// Format of the `isodate` filter, e.g. `2012-07-09 06:00 -0700`.
const ISODATE_FORMAT: &str = "%Y-%m-%d %H:%M %z";

/// Parent index hg prints for a missing parent slot.
const NO_PARENT: &str = "-1";

const ENTITIES: &[(&str, char)] = &[("&lt;", '<'), ("&gt;", '>'), ("&amp;", '&'), ("&quot;", '"')];

/// Parse one line of [`METADATA_TEMPLATE`] output.
///
/// The description is everything between the third separator and the last
/// one, so a description that contains the separator survives intact.
/// Parents are `index:node` tokens; index `-1` marks an absent parent.
pub fn parse_metadata(raw: &str, repository_name: &str) -> Result<RevisionMetadata, RepositoryError> {
    let line = raw.trim_end_matches(['\n', '\r']);
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    if fields.len() < 5 {
        return Err(RepositoryError::malformed(
            raw,
            format!("expected 5 fields separated by {FIELD_SEPARATOR:?}, found {}", fields.len()),
        ));
    }

    let last = fields.len() - 1;
    let date_text = unescape(fields[2]);
    let date = parse_date(&date_text).ok_or_else(|| {
        RepositoryError::malformed(raw, format!("unparseable date {date_text:?}"))
    })?;
    let parents = parse_parents(fields[last], repository_name)
        .ok_or_else(|| RepositoryError::malformed(raw, "parent token without ':'"))?;

    let metadata = RevisionMetadata {
        id: unescape(fields[0]),
        author: unescape(fields[1]),
        date,
        description: unescape(&fields[3..last].join(FIELD_SEPARATOR)),
        parents,
    };
    debug!(id = %metadata.id, parents = metadata.parents.len(), "parsed hg metadata");
    Ok(metadata)
}

/// Undo hg's `escape` filter in a single left-to-right pass.
///
/// Replacement text is never rescanned, so `&amp;amp;` becomes `&amp;`.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
            Some((entity, ch)) => {
                out.push(*ch);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn parse_date(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(s.trim(), ISODATE_FORMAT).ok()
}

fn parse_parents(field: &str, repository_name: &str) -> Option<Vec<Revision>> {
    let mut parents = Vec::new();
    for token in field.split_whitespace() {
        let (index, node) = token.split_once(':')?;
        if index != NO_PARENT {
            parents.push(Revision::new(unescape(node), repository_name));
        }
    }
    Some(parents)
}

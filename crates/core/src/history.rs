//! Revision histories and the ancestry search.
//!
//! [`RevisionHistory`] is implemented once per VCS kind. Everything else in
//! this module is VCS-agnostic: [`find_revisions`] walks ancestry lazily,
//! fetching metadata one revision at a time, and asks a [`RevisionMatcher`]
//! where to stop.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, info, instrument};

use crate::errors::RepositoryError;
use crate::models::{Revision, RevisionMetadata};

/// Query capability over one repository's commit graph.
pub trait RevisionHistory {
    /// Name of the repository this history describes.
    fn repository_name(&self) -> &str;

    /// The latest revision on the configured branch, or `rev_id` after
    /// checking that it exists there.
    ///
    /// An unknown revision is reported as
    /// [`RepositoryError::UnknownRevision`].
    fn find_highest_revision(&self, rev_id: Option<&str>) -> Result<Revision, RepositoryError>;

    /// Every branch head, one per branch name, in the tool's listing order.
    fn find_head_revisions(&self) -> Result<Vec<Revision>, RepositoryError>;

    /// Metadata for exactly one revision.
    fn get_metadata(&self, revision: &Revision) -> Result<RevisionMetadata, RepositoryError>;
}

/// How [`find_revisions`] expands a revision's parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    /// Follow only the first (mainline) parent.
    Linear,
    /// Follow every parent, breadth first.
    Branched,
}

/// Decides where an ancestry walk stops and what it produces.
pub trait RevisionMatcher {
    type Output;

    /// Whether the walk should stop at `revision` instead of expanding it.
    fn matches(&self, revision: &Revision) -> Result<bool, RepositoryError>;

    /// Build the output from the non-matching revisions and the matching
    /// ones, both in discovery order.
    fn make_result(
        &self,
        graph: RevisionGraph,
        matching: Vec<Revision>,
    ) -> Result<Self::Output, RepositoryError>;
}

/// Revisions visited by a walk that did not match, with their metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionGraph {
    order: Vec<Revision>,
    metadata: HashMap<Revision, RevisionMetadata>,
}

impl RevisionGraph {
    fn push(&mut self, revision: Revision, metadata: RevisionMetadata) {
        self.metadata.insert(revision.clone(), metadata);
        self.order.push(revision);
    }

    /// Revisions in breadth-first discovery order.
    pub fn breadth_first_history(&self) -> &[Revision] {
        &self.order
    }

    pub fn metadata(&self, revision: &Revision) -> Option<&RevisionMetadata> {
        self.metadata.get(revision)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Walk the ancestry of `start` (all heads when `None`) until `matcher`
/// matches, and let the matcher assemble the result.
///
/// Matching revisions are neither expanded nor queried for metadata. Every
/// other revision is fetched once, recorded, and its parents (all of them for
/// [`SearchType::Branched`], only the first for [`SearchType::Linear`]) are
/// queued unless already seen. Any failing query aborts the walk.
#[instrument(skip(history, matcher), fields(repository = history.repository_name()))]
pub fn find_revisions<H, M>(
    history: &H,
    start: Option<&Revision>,
    matcher: &M,
    search: SearchType,
) -> Result<M::Output, RepositoryError>
where
    H: RevisionHistory + ?Sized,
    M: RevisionMatcher + ?Sized,
{
    let starting = match start {
        Some(revision) => vec![revision.clone()],
        None => history.find_head_revisions()?,
    };
    if search == SearchType::Linear && starting.len() > 1 {
        return Err(RepositoryError::AmbiguousLinearStart {
            repository: history.repository_name().to_string(),
            heads: starting.len(),
        });
    }

    let mut queue = VecDeque::new();
    let mut seen = HashSet::new();
    for revision in starting {
        if seen.insert(revision.clone()) {
            queue.push_back(revision);
        }
    }

    let mut graph = RevisionGraph::default();
    let mut matching = Vec::new();
    while let Some(current) = queue.pop_front() {
        if matcher.matches(&current)? {
            debug!(revision = %current, "revision matched");
            matching.push(current);
            continue;
        }

        let metadata = history.get_metadata(&current)?;
        let parents = match search {
            SearchType::Linear => &metadata.parents[..metadata.parents.len().min(1)],
            SearchType::Branched => &metadata.parents[..],
        };
        for parent in parents {
            if seen.insert(parent.clone()) {
                queue.push_back(parent.clone());
            }
        }
        graph.push(current, metadata);
    }

    info!(
        new_revisions = graph.len(),
        matched = matching.len(),
        "ancestry walk complete"
    );
    matcher.make_result(graph, matching)
}

/// Parse `"<rev> <branch>"` lines into head revisions of `repository_name`.
///
/// Keeps the first head per branch name, in listing order. With
/// `branch_filter`, lines for other branches are dropped.
pub fn parse_head_listing(
    output: &str,
    repository_name: &str,
    branch_filter: Option<&str>,
) -> Vec<Revision> {
    let mut branches = HashSet::new();
    let mut heads = Vec::new();
    for line in output.lines() {
        let mut parts = line.split_whitespace();
        let (Some(rev_id), Some(branch)) = (parts.next(), parts.next()) else {
            continue;
        };
        if branch_filter.is_some_and(|wanted| wanted != branch) {
            continue;
        }
        if branches.insert(branch) {
            heads.push(Revision::new(rev_id, repository_name));
        }
    }
    heads
}

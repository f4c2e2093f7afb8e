//! Revision history of a Mercurial clone, queried through `hg log`.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::parser::{parse_metadata, METADATA_TEMPLATE};
use crate::command::CommandRunner;
use crate::errors::{CommandError, RepositoryError};
use crate::history::{parse_head_listing, RevisionHistory};
use crate::models::{Revision, RevisionMetadata};
use crate::repository::ClonedRepository;

/// Exit status of `hg` when a revision cannot be resolved.
const HG_UNKNOWN_REVISION_EXIT_CODE: i32 = 255;

/// [`RevisionHistory`] over an `hg` clone.
pub struct HgRevisionHistory {
    cmd: Arc<dyn CommandRunner>,
    clone: Arc<dyn ClonedRepository>,
}

impl HgRevisionHistory {
    pub fn new(cmd: Arc<dyn CommandRunner>, clone: Arc<dyn ClonedRepository>) -> Self {
        Self { cmd, clone }
    }

    fn hg(&self, args: &[String]) -> Result<String, RepositoryError> {
        let dir = self.clone.local_temp_dir()?;
        Ok(self.cmd.run_command("hg", args, dir)?)
    }

    /// Run `args`, turning hg's unknown-revision failure into
    /// [`RepositoryError::UnknownRevision`] for `rev_id`.
    fn hg_for_revision(&self, args: &[String], rev_id: &str) -> Result<String, RepositoryError> {
        self.hg(args).map_err(|e| match e {
            RepositoryError::Command(err) if is_unknown_revision(&err) => {
                RepositoryError::UnknownRevision {
                    rev_id: rev_id.to_string(),
                    repository: self.clone.repository_name().to_string(),
                }
            }
            other => other,
        })
    }
}

fn is_unknown_revision(err: &CommandError) -> bool {
    err.exit_code == HG_UNKNOWN_REVISION_EXIT_CODE && err.stderr.contains("unknown revision")
}

impl RevisionHistory for HgRevisionHistory {
    fn repository_name(&self) -> &str {
        self.clone.repository_name()
    }

    #[instrument(skip(self), fields(repository = %self.repository_name()))]
    fn find_highest_revision(&self, rev_id: Option<&str>) -> Result<Revision, RepositoryError> {
        let branch = self.clone.branch()?;
        let mut args = vec![
            "log".to_string(),
            format!("--branch={branch}"),
            "--limit=1".to_string(),
            "--template={node}".to_string(),
        ];
        if let Some(rev_id) = rev_id {
            args.push(format!("--rev={rev_id}"));
        }

        let wanted = rev_id.unwrap_or(branch);
        let node = self.hg_for_revision(&args, wanted)?.trim().to_string();
        if node.is_empty() {
            return Err(RepositoryError::UnknownRevision {
                rev_id: wanted.to_string(),
                repository: self.repository_name().to_string(),
            });
        }
        debug!(%node, "resolved highest revision");
        Ok(Revision::new(node, self.repository_name()))
    }

    #[instrument(skip(self), fields(repository = %self.repository_name()))]
    fn find_head_revisions(&self) -> Result<Vec<Revision>, RepositoryError> {
        let args = vec![
            "heads".to_string(),
            self.clone.branch()?.to_string(),
            "--template={node} {branch}\n".to_string(),
        ];
        let output = self.hg(&args)?;
        let heads = parse_head_listing(&output, self.repository_name(), None);
        debug!(count = heads.len(), "listed hg heads");
        Ok(heads)
    }

    #[instrument(skip(self), fields(revision = %revision))]
    fn get_metadata(&self, revision: &Revision) -> Result<RevisionMetadata, RepositoryError> {
        let args = vec![
            "log".to_string(),
            format!("--rev={}", revision.rev_id),
            "--limit=1".to_string(),
            format!("--template={METADATA_TEMPLATE}"),
            "--debug".to_string(),
        ];
        let output = self.hg_for_revision(&args, &revision.rev_id)?;
        parse_metadata(&output, self.repository_name())
    }
}

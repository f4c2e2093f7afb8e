//! Revision history of a git clone.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::parser::{normalize_ref_listing, parse_log_record, METADATA_FORMAT};
use crate::command::{args, CommandRunner};
use crate::errors::{CommandError, RepositoryError};
use crate::history::{parse_head_listing, RevisionHistory};
use crate::models::{Revision, RevisionMetadata};
use crate::repository::ClonedRepository;

/// Exit status of `git` for fatal errors, including unknown revisions.
const GIT_FATAL_EXIT_CODE: i32 = 128;

/// Exit status of `git merge-base --is-ancestor` when the answer is no.
const NOT_ANCESTOR_EXIT_CODE: i32 = 1;

/// [`RevisionHistory`] over a `git` clone.
pub struct GitRevisionHistory {
    cmd: Arc<dyn CommandRunner>,
    clone: Arc<dyn ClonedRepository>,
}

impl GitRevisionHistory {
    pub fn new(cmd: Arc<dyn CommandRunner>, clone: Arc<dyn ClonedRepository>) -> Self {
        Self { cmd, clone }
    }

    fn git(&self, args: &[String], rev_id: &str) -> Result<String, RepositoryError> {
        let dir = self.clone.local_temp_dir()?;
        self.cmd.run_command("git", args, dir).map_err(|err| {
            if is_unknown_revision(&err) {
                self.unknown_revision(rev_id)
            } else {
                err.into()
            }
        })
    }

    fn unknown_revision(&self, rev_id: &str) -> RepositoryError {
        RepositoryError::UnknownRevision {
            rev_id: rev_id.to_string(),
            repository: self.repository_name().to_string(),
        }
    }

    /// Whether `sha` is reachable from the tip of `branch`.
    fn is_on_branch(&self, sha: &str, branch: &str) -> Result<bool, RepositoryError> {
        let dir = self.clone.local_temp_dir()?;
        match self
            .cmd
            .run_command("git", &args(["merge-base", "--is-ancestor", sha, branch]), dir)
        {
            Ok(_) => Ok(true),
            Err(err) if err.exit_code == NOT_ANCESTOR_EXIT_CODE => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

fn is_unknown_revision(err: &CommandError) -> bool {
    err.exit_code == GIT_FATAL_EXIT_CODE
        && (err.stderr.contains("unknown revision") || err.stderr.contains("bad revision"))
}

impl RevisionHistory for GitRevisionHistory {
    fn repository_name(&self) -> &str {
        self.clone.repository_name()
    }

    #[instrument(skip(self), fields(repository = %self.repository_name()))]
    fn find_highest_revision(&self, rev_id: Option<&str>) -> Result<Revision, RepositoryError> {
        let branch = self.clone.branch()?;
        let wanted = rev_id.unwrap_or(branch);
        let output = self.git(
            &args(["log", "--max-count=1", "--format=%H", wanted, "--"]),
            wanted,
        )?;
        let sha = output.trim();
        if sha.is_empty() {
            return Err(self.unknown_revision(wanted));
        }
        if rev_id.is_some() && !self.is_on_branch(sha, branch)? {
            debug!(%sha, branch, "revision is not an ancestor of the branch head");
            return Err(self.unknown_revision(wanted));
        }
        debug!(%sha, "resolved highest revision");
        Ok(Revision::new(sha, self.repository_name()))
    }

    #[instrument(skip(self), fields(repository = %self.repository_name()))]
    fn find_head_revisions(&self) -> Result<Vec<Revision>, RepositoryError> {
        let branch = self.clone.branch()?;
        let output = self.git(
            &args([
                "for-each-ref",
                "--format=%(objectname) %(refname:short)",
                "refs/heads",
                "refs/remotes/origin",
            ]),
            branch,
        )?;
        let heads = parse_head_listing(
            &normalize_ref_listing(&output),
            self.repository_name(),
            Some(branch),
        );
        debug!(count = heads.len(), "listed git heads");
        Ok(heads)
    }

    #[instrument(skip(self), fields(revision = %revision))]
    fn get_metadata(&self, revision: &Revision) -> Result<RevisionMetadata, RepositoryError> {
        let format = format!("--format={METADATA_FORMAT}");
        let output = self.git(
            &args([
                "log",
                "--max-count=1",
                "--date=iso-strict",
                format.as_str(),
                revision.rev_id.as_str(),
                "--",
            ]),
            &revision.rev_id,
        )?;
        parse_log_record(&output, self.repository_name())
    }
}

//! Git working-copy clones.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::command::{args, CommandRunner};
use crate::config::{RepositoryConfig, RepositoryKind};
use crate::errors::RepositoryError;
use crate::filesystem::{FileSystem, Lifetime};
use crate::repository::{clone_dir_prefix, CloneState, ClonedRepository};

/// A local `git clone` of a configured repository.
pub struct GitClonedRepository {
    repository_name: String,
    config: RepositoryConfig,
    cmd: Arc<dyn CommandRunner>,
    fs: Arc<dyn FileSystem>,
    state: CloneState,
}

impl GitClonedRepository {
    pub fn new(
        repository_name: impl Into<String>,
        config: RepositoryConfig,
        cmd: Arc<dyn CommandRunner>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            repository_name: repository_name.into(),
            config,
            cmd,
            fs,
            state: CloneState::Unbound,
        }
    }
}

impl ClonedRepository for GitClonedRepository {
    fn repository_name(&self) -> &str {
        &self.repository_name
    }

    fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    fn local_temp_dir(&self) -> Result<&Path, RepositoryError> {
        self.state.local_dir(&self.repository_name)
    }

    fn branch(&self) -> Result<&str, RepositoryError> {
        self.state.branch(&self.repository_name)
    }

    #[instrument(skip(self), fields(repository = %self.repository_name, url = %self.config.url))]
    fn clone_locally_at_head(&mut self, lifetime: Lifetime) -> Result<(), RepositoryError> {
        self.state.ensure_unbound(&self.repository_name)?;

        let prefix = clone_dir_prefix(RepositoryKind::Git, &self.repository_name);
        let local_dir = self.fs.temporary_directory(&prefix, lifetime)?;

        let mut clone_args = vec![
            "clone".to_string(),
            self.config.url.clone(),
            local_dir.to_string_lossy().to_string(),
        ];
        if let Some(branch) = &self.config.branch {
            clone_args.push(format!("--branch={branch}"));
        }
        self.cmd.run_command("git", &clone_args, Path::new(""))?;

        let branch = self
            .cmd
            .run_command("git", &args(["rev-parse", "--abbrev-ref", "HEAD"]), &local_dir)?
            .trim()
            .to_string();
        info!(path = %local_dir.display(), %branch, "git clone completed");

        self.state = CloneState::Bound { local_dir, branch };
        Ok(())
    }
}

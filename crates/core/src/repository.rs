//! Cloned working copies and repository wiring.
//!
//! A [`ClonedRepository`] is a one-shot resource: it starts unbound and
//! [`ClonedRepository::clone_locally_at_head`] binds it to a fresh local
//! directory exactly once. [`RepositoryFactory`] picks the VCS-specific
//! implementation for a [`RepositoryConfig`] and hands back a ready-to-query
//! [`Repository`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::command::{CommandRunner, SystemCommandRunner};
use crate::config::{RepositoryConfig, RepositoryKind};
use crate::errors::RepositoryError;
use crate::filesystem::{FileSystem, Lifetime, LocalFileSystem};
use crate::git::{GitClonedRepository, GitRevisionHistory};
use crate::hg::{HgClonedRepository, HgRevisionHistory};
use crate::history::RevisionHistory;

/// A local working copy of a repository, pinned at clone time.
///
/// Not safe for concurrent use: cloning takes `&mut self` and a second call
/// fails with [`RepositoryError::AlreadyCloned`].
pub trait ClonedRepository: Send + Sync {
    fn repository_name(&self) -> &str;

    fn config(&self) -> &RepositoryConfig;

    /// Directory holding the clone. Fails before a successful clone.
    fn local_temp_dir(&self) -> Result<&Path, RepositoryError>;

    /// Branch the clone resolved to. Fails before a successful clone.
    fn branch(&self) -> Result<&str, RepositoryError>;

    /// Clone the configured URL into a freshly allocated directory.
    fn clone_locally_at_head(&mut self, lifetime: Lifetime) -> Result<(), RepositoryError>;
}

/// Lifecycle of a [`ClonedRepository`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CloneState {
    #[default]
    Unbound,
    Bound { local_dir: PathBuf, branch: String },
}

impl CloneState {
    /// Fail with [`RepositoryError::AlreadyCloned`] unless still unbound.
    pub fn ensure_unbound(&self, repository_name: &str) -> Result<(), RepositoryError> {
        match self {
            Self::Unbound => Ok(()),
            Self::Bound { .. } => Err(RepositoryError::AlreadyCloned(repository_name.to_string())),
        }
    }

    pub fn local_dir(&self, repository_name: &str) -> Result<&Path, RepositoryError> {
        match self {
            Self::Bound { local_dir, .. } => Ok(local_dir),
            Self::Unbound => Err(RepositoryError::NotCloned(repository_name.to_string())),
        }
    }

    pub fn branch(&self, repository_name: &str) -> Result<&str, RepositoryError> {
        match self {
            Self::Bound { branch, .. } => Ok(branch),
            Self::Unbound => Err(RepositoryError::NotCloned(repository_name.to_string())),
        }
    }
}

/// Deterministic prefix of the temporary directory for a clone.
pub fn clone_dir_prefix(kind: RepositoryKind, repository_name: &str) -> String {
    format!("{kind}_clone_{repository_name}_")
}

/// A named repository with a queryable history.
pub struct Repository {
    pub name: String,
    pub history: Box<dyn RevisionHistory>,
}

/// Builds cloned repositories and histories for configured repositories.
#[derive(Clone)]
pub struct RepositoryFactory {
    cmd: Arc<dyn CommandRunner>,
    fs: Arc<dyn FileSystem>,
}

impl RepositoryFactory {
    pub fn new(cmd: Arc<dyn CommandRunner>, fs: Arc<dyn FileSystem>) -> Self {
        Self { cmd, fs }
    }

    /// Factory running the real VCS binaries, cloning under the system
    /// temporary directory.
    pub fn system() -> Self {
        Self::new(
            Arc::new(SystemCommandRunner),
            Arc::new(LocalFileSystem::in_system_temp()),
        )
    }

    /// An unbound clone of `config`, using the implementation for its kind.
    pub fn cloned_repository(
        &self,
        name: &str,
        config: &RepositoryConfig,
    ) -> Box<dyn ClonedRepository> {
        match config.kind {
            RepositoryKind::Hg => Box::new(HgClonedRepository::new(
                name,
                config.clone(),
                Arc::clone(&self.cmd),
                Arc::clone(&self.fs),
            )),
            RepositoryKind::Git => Box::new(GitClonedRepository::new(
                name,
                config.clone(),
                Arc::clone(&self.cmd),
                Arc::clone(&self.fs),
            )),
        }
    }

    /// Clone `config` at head and wrap the clone in the matching history.
    pub fn open(
        &self,
        name: &str,
        config: &RepositoryConfig,
        lifetime: Lifetime,
    ) -> Result<Repository, RepositoryError> {
        let mut clone = self.cloned_repository(name, config);
        clone.clone_locally_at_head(lifetime)?;
        info!(repository = name, kind = %config.kind, "opened repository");

        let clone: Arc<dyn ClonedRepository> = Arc::from(clone);
        let history: Box<dyn RevisionHistory> = match config.kind {
            RepositoryKind::Hg => Box::new(HgRevisionHistory::new(Arc::clone(&self.cmd), clone)),
            RepositoryKind::Git => Box::new(GitRevisionHistory::new(Arc::clone(&self.cmd), clone)),
        };
        Ok(Repository {
            name: name.to_string(),
            history,
        })
    }
}

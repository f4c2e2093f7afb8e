//! equisync core library.
//!
//! Finds where independently version-controlled copies of one codebase last
//! converged. Repositories are cloned and queried through their VCS command
//! line, commit ancestry is walked breadth first, and each revision is checked
//! against a database of known cross-repository equivalences.

pub mod command;
pub mod config;
pub mod db;
pub mod errors;
pub mod filesystem;
pub mod git;
pub mod hg;
pub mod history;
pub mod matcher;
pub mod models;
pub mod repository;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-exports for convenience.
pub use command::{CommandRunner, SystemCommandRunner};
pub use config::ProjectConfig;
pub use db::{open_database, Db, Equivalence, FileDb, SqliteDb};
pub use errors::CoreError;
pub use filesystem::{FileSystem, Lifetime, LocalFileSystem};
pub use history::{find_revisions, RevisionHistory, RevisionMatcher, SearchType};
pub use matcher::{EquivalenceMatchResult, EquivalenceMatcher};
pub use models::{Revision, RevisionMetadata};
pub use repository::{ClonedRepository, Repository, RepositoryFactory};

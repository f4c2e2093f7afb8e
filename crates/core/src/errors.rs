//! Error types for the equisync core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// External command errors
// ---------------------------------------------------------------------------

/// A VCS command exited with a non-zero status, or could not be spawned.
///
/// Carries everything the command produced so that callers can recognise
/// tool-specific failure signals (see [`RepositoryError::UnknownRevision`]).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("command `{cmd} {}` failed (exit {exit_code}): {stderr}", .args.join(" "))]
pub struct CommandError {
    pub cmd: String,
    pub args: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandError {
    pub fn new(
        cmd: impl Into<String>,
        args: Vec<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        exit_code: i32,
    ) -> Self {
        Self {
            cmd: cmd.into(),
            args,
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }
}

// ---------------------------------------------------------------------------
// Repository errors
// ---------------------------------------------------------------------------

/// Errors from cloning, querying and walking a repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// An external VCS command failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The requested revision does not exist in the repository.
    #[error("no revision '{rev_id}' in repository '{repository}'")]
    UnknownRevision { rev_id: String, repository: String },

    /// `clone_locally_at_head` was called on an already-cloned repository.
    #[error("repository '{0}' has already been cloned; a clone may only be performed once")]
    AlreadyCloned(String),

    /// A clone accessor was used before `clone_locally_at_head`.
    #[error("repository '{0}' has not been cloned yet")]
    NotCloned(String),

    /// Command output did not have the expected shape.
    #[error("malformed revision metadata {raw:?}: {detail}")]
    MalformedMetadata { raw: String, detail: String },

    /// A linear walk needs exactly one starting revision.
    #[error("cannot find a linear history from {heads} heads in repository '{repository}'")]
    AmbiguousLinearStart { repository: String, heads: usize },

    /// The equivalence lookup performed during a walk failed.
    #[error("equivalence lookup failed: {0}")]
    Database(#[from] DatabaseError),

    /// Generic I/O wrapper (temporary directory allocation and the like).
    #[error("repository I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RepositoryError {
    pub(crate) fn malformed(raw: &str, detail: impl Into<String>) -> Self {
        Self::MalformedMetadata {
            raw: raw.to_string(),
            detail: detail.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Database errors
// ---------------------------------------------------------------------------

/// Errors from the equivalence database layer.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Underlying rusqlite error.
    #[error("database error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// A migration failed.
    #[error("database migration failed (version {version}): {detail}")]
    MigrationFailed { version: u32, detail: String },

    /// The persisted JSON could not be read or written.
    #[error("database JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An equivalence must span two different repositories.
    #[error("invalid equivalence: both revisions belong to repository '{0}'")]
    InvalidEquivalence(String),

    /// Generic I/O error (e.g. file permissions).
    #[error("database I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// The project names no repository with this name.
    #[error("no repository named '{0}' in project configuration")]
    UnknownRepository(String),

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = CommandError::new(
            "hg",
            vec!["log".into(), "--rev=abc".into()],
            "",
            "abort: unknown revision 'abc'!",
            255,
        );
        assert_eq!(
            err.to_string(),
            "command `hg log --rev=abc` failed (exit 255): abort: unknown revision 'abc'!"
        );

        let err = RepositoryError::UnknownRevision {
            rev_id: "bogus".into(),
            repository: "internal".into(),
        };
        assert_eq!(err.to_string(), "no revision 'bogus' in repository 'internal'");

        let err = DatabaseError::InvalidEquivalence("public".into());
        assert!(err.to_string().contains("public"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let repo_err = RepositoryError::AlreadyCloned("internal".into());
        let core_err: CoreError = repo_err.into();
        assert!(matches!(core_err, CoreError::Repository(_)));

        let cmd_err = CommandError::new("git", vec![], "", "boom", 1);
        let repo_err: RepositoryError = cmd_err.into();
        assert!(matches!(repo_err, RepositoryError::Command(_)));
    }
}

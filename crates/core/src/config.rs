//! TOML-based project configuration for equisync.
//!
//! A project names the repositories that mirror one logical codebase and the
//! equivalence database that links their histories:
//!
//! ```toml
//! name = "widgets"
//!
//! [database]
//! path = "/var/lib/equisync/widgets.json"
//! format = "json"
//!
//! [repositories.internal]
//! kind = "hg"
//! url = "https://hg.example.com/widgets"
//! branch = "default"
//!
//! [repositories.public]
//! kind = "git"
//! url = "https://github.com/acme/widgets.git"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level project configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name.
    pub name: String,

    /// Equivalence database settings.
    pub database: DatabaseConfig,

    /// Repositories keyed by repository name.
    #[serde(default)]
    pub repositories: BTreeMap<String, RepositoryConfig>,
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

/// On-disk format of the equivalence database.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseFormat {
    /// `{"equivalences": [...]}` JSON text file.
    #[default]
    Json,
    /// SQLite database file.
    Sqlite,
}

/// Equivalence database location and format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,

    #[serde(default)]
    pub format: DatabaseFormat,
}

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

/// Version control system behind a repository.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryKind {
    Hg,
    Git,
}

impl RepositoryKind {
    /// Name of the command-line binary for this VCS.
    pub fn binary(self) -> &'static str {
        match self {
            Self::Hg => "hg",
            Self::Git => "git",
        }
    }
}

impl std::fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.binary())
    }
}

/// Where a repository lives and which branch to follow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub kind: RepositoryKind,

    /// Clone URL (or local path).
    pub url: String,

    /// Branch to pin the clone to; the VCS default branch when absent.
    #[serde(default)]
    pub branch: Option<String>,
}

impl RepositoryConfig {
    pub fn new(kind: RepositoryKind, url: impl Into<String>, branch: Option<&str>) -> Self {
        Self {
            kind,
            url: url.into(),
            branch: branch.map(str::to_string),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl ProjectConfig {
    /// Load a [`ProjectConfig`] from a TOML file at the given path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading project configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;

        debug!(
            project = %config.name,
            repositories = config.repositories.len(),
            "project configuration parsed successfully"
        );
        Ok(config)
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "name".into(),
                detail: "project name must not be empty".into(),
            });
        }
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database.path".into(),
                detail: "database path must not be empty".into(),
            });
        }
        if self.repositories.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "repositories".into(),
                detail: "at least one repository must be configured".into(),
            });
        }
        for (name, repo) in &self.repositories {
            if repo.url.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("repositories.{name}.url"),
                    detail: "repository URL must not be empty".into(),
                });
            }
            if matches!(repo.branch.as_deref(), Some(b) if b.trim().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("repositories.{name}.branch"),
                    detail: "branch must be omitted or non-empty".into(),
                });
            }
        }
        Ok(())
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Look up a repository by name.
    pub fn repository(&self, name: &str) -> Result<&RepositoryConfig, ConfigError> {
        self.repositories
            .get(name)
            .ok_or_else(|| ConfigError::UnknownRepository(name.to_string()))
    }
}

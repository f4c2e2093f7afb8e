//! Temporary directory allocation for local clones.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tempfile::TempDir;
use tracing::{debug, info, warn};

/// How long an allocated directory should outlive the task that asked for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Scratch space, removed by [`FileSystem::cleanup_current_task`].
    CurrentTask,
    /// Kept on disk after the process exits.
    Persistent,
}

/// Capability that hands out fresh directories with a managed lifetime.
pub trait FileSystem: Send + Sync {
    /// Allocate a new, empty directory whose name starts with `prefix`.
    fn temporary_directory(&self, prefix: &str, lifetime: Lifetime) -> io::Result<PathBuf>;

    /// Remove every directory allocated with [`Lifetime::CurrentTask`].
    fn cleanup_current_task(&self) -> io::Result<()>;
}

/// [`FileSystem`] backed by `tempfile`, allocating under a root directory.
pub struct LocalFileSystem {
    root: PathBuf,
    scratch: Mutex<Vec<TempDir>>,
}

impl LocalFileSystem {
    /// Allocate directories under `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            scratch: Mutex::new(Vec::new()),
        }
    }

    /// Allocate directories under the system temporary directory.
    pub fn in_system_temp() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scratch(&self) -> MutexGuard<'_, Vec<TempDir>> {
        self.scratch.lock().unwrap_or_else(|poisoned| {
            warn!("scratch directory list mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl FileSystem for LocalFileSystem {
    fn temporary_directory(&self, prefix: &str, lifetime: Lifetime) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.root)?;
        let dir = tempfile::Builder::new().prefix(prefix).tempdir_in(&self.root)?;
        debug!(path = %dir.path().display(), ?lifetime, "allocated temporary directory");
        match lifetime {
            Lifetime::CurrentTask => {
                let path = dir.path().to_path_buf();
                self.scratch().push(dir);
                Ok(path)
            }
            Lifetime::Persistent => Ok(dir.keep()),
        }
    }

    fn cleanup_current_task(&self) -> io::Result<()> {
        let dirs: Vec<TempDir> = self.scratch().drain(..).collect();
        info!(count = dirs.len(), "removing scratch directories");
        for dir in dirs {
            dir.close()?;
        }
        Ok(())
    }
}

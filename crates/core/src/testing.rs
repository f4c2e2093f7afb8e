//! Test doubles for the injected capabilities.
//!
//! [`ScriptedCommandRunner`] replays an ordered script of expected commands
//! and panics on anything off-script, so tests state exactly which VCS
//! invocations an operation makes. [`FixedFileSystem`] hands out a known
//! directory. [`StaticClone`] is an already-cloned repository.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::command::{args, CommandRunner};
use crate::config::{RepositoryConfig, RepositoryKind};
use crate::errors::{CommandError, RepositoryError};
use crate::filesystem::{FileSystem, Lifetime};
use crate::repository::ClonedRepository;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug)]
struct Expectation {
    cmd: String,
    args: Vec<String>,
    working_dir: PathBuf,
    outcome: Result<String, CommandError>,
}

/// A [`CommandRunner`] that answers from a script, in order.
#[derive(Debug, Default)]
pub struct ScriptedCommandRunner {
    script: Mutex<VecDeque<Expectation>>,
}

impl ScriptedCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect `cmd args` in `working_dir`, answering `stdout`.
    pub fn expect(&self, cmd: &str, cmd_args: &[&str], working_dir: &str, stdout: &str) -> &Self {
        self.expect_args(cmd, args(cmd_args.iter().copied()), working_dir, stdout)
    }

    /// Like [`expect`](Self::expect) with owned arguments.
    pub fn expect_args(
        &self,
        cmd: &str,
        cmd_args: Vec<String>,
        working_dir: &str,
        stdout: &str,
    ) -> &Self {
        self.push(cmd, cmd_args, working_dir, Ok(stdout.to_string()))
    }

    /// Expect `cmd args` in `working_dir` and fail it with `error`.
    pub fn expect_failure(
        &self,
        cmd: &str,
        cmd_args: &[&str],
        working_dir: &str,
        error: CommandError,
    ) -> &Self {
        self.push(cmd, args(cmd_args.iter().copied()), working_dir, Err(error))
    }

    fn push(
        &self,
        cmd: &str,
        cmd_args: Vec<String>,
        working_dir: &str,
        outcome: Result<String, CommandError>,
    ) -> &Self {
        lock(&self.script).push_back(Expectation {
            cmd: cmd.to_string(),
            args: cmd_args,
            working_dir: PathBuf::from(working_dir),
            outcome,
        });
        self
    }

    /// Panic unless every scripted command ran.
    pub fn verify(&self) {
        let script = lock(&self.script);
        assert!(
            script.is_empty(),
            "{} scripted command(s) never ran, next: {:?}",
            script.len(),
            script.front()
        );
    }
}

impl CommandRunner for ScriptedCommandRunner {
    fn run_command(
        &self,
        cmd: &str,
        args: &[String],
        working_dir: &Path,
    ) -> Result<String, CommandError> {
        let Some(expected) = lock(&self.script).pop_front() else {
            panic!("unexpected command: {cmd} {args:?} in {}", working_dir.display());
        };
        assert_eq!(
            (expected.cmd.as_str(), expected.args.as_slice(), expected.working_dir.as_path()),
            (cmd, args, working_dir),
            "command did not match the script"
        );
        expected.outcome
    }
}

/// A [`FileSystem`] that always allocates the same directory and records
/// what was asked for.
#[derive(Debug)]
pub struct FixedFileSystem {
    dir: PathBuf,
    requests: Mutex<Vec<(String, Lifetime)>>,
}

impl FixedFileSystem {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// `(prefix, lifetime)` of every allocation, in order.
    pub fn requests(&self) -> Vec<(String, Lifetime)> {
        lock(&self.requests).clone()
    }
}

impl FileSystem for FixedFileSystem {
    fn temporary_directory(&self, prefix: &str, lifetime: Lifetime) -> io::Result<PathBuf> {
        lock(&self.requests).push((prefix.to_string(), lifetime));
        Ok(self.dir.clone())
    }

    fn cleanup_current_task(&self) -> io::Result<()> {
        Ok(())
    }
}

/// A [`ClonedRepository`] that is already bound to a directory and branch.
#[derive(Debug, Clone)]
pub struct StaticClone {
    name: String,
    config: RepositoryConfig,
    dir: PathBuf,
    branch: String,
}

impl StaticClone {
    pub fn new(name: &str, kind: RepositoryKind, dir: &str, branch: &str) -> Self {
        Self {
            name: name.to_string(),
            config: RepositoryConfig::new(kind, format!("/srv/{name}"), Some(branch)),
            dir: PathBuf::from(dir),
            branch: branch.to_string(),
        }
    }

    pub fn hg(name: &str, dir: &str, branch: &str) -> Self {
        Self::new(name, RepositoryKind::Hg, dir, branch)
    }

    pub fn git(name: &str, dir: &str, branch: &str) -> Self {
        Self::new(name, RepositoryKind::Git, dir, branch)
    }
}

impl ClonedRepository for StaticClone {
    fn repository_name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    fn local_temp_dir(&self) -> Result<&Path, RepositoryError> {
        Ok(&self.dir)
    }

    fn branch(&self) -> Result<&str, RepositoryError> {
        Ok(&self.branch)
    }

    fn clone_locally_at_head(&mut self, _lifetime: Lifetime) -> Result<(), RepositoryError> {
        Err(RepositoryError::AlreadyCloned(self.name.clone()))
    }
}

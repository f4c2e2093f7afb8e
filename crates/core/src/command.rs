//! External command execution.
//!
//! Revision histories and cloned repositories never spawn processes
//! themselves; they receive a [`CommandRunner`] so that tests can substitute
//! a scripted double (`testing::ScriptedCommandRunner`).

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::errors::CommandError;

/// Capability to run a VCS binary and capture its standard output.
pub trait CommandRunner: Send + Sync {
    /// Run `cmd` with `args` inside `working_dir` and return its stdout.
    ///
    /// An empty `working_dir` runs the command in the current directory.
    /// A non-zero exit status yields a [`CommandError`] carrying the captured
    /// stdout, stderr and exit code.
    fn run_command(&self, cmd: &str, args: &[String], working_dir: &Path)
        -> Result<String, CommandError>;
}

/// [`CommandRunner`] backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run_command(
        &self,
        cmd: &str,
        args: &[String],
        working_dir: &Path,
    ) -> Result<String, CommandError> {
        let mut command = Command::new(cmd);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if !working_dir.as_os_str().is_empty() {
            command.current_dir(working_dir);
        }

        debug!(cmd = ?format!("{} {}", cmd, args.join(" ")), dir = %working_dir.display(), "running command");
        let output = command.output().map_err(|e| {
            warn!(cmd, error = %e, "failed to spawn command");
            CommandError::new(cmd, args.to_vec(), "", e.to_string(), -1)
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let exit_code = output.status.code().unwrap_or(-1);
            warn!(cmd, exit_code, %stderr, "command failed");
            return Err(CommandError::new(cmd, args.to_vec(), stdout, stderr, exit_code));
        }
        Ok(stdout)
    }
}

/// Build an owned argument list from string literals and formatted values.
pub(crate) fn args<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

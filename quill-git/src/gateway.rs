//! Command Gateway: argument-vector subprocess execution.
//!
//! All operations shell out to the `git` binary using
//! `tokio::process::Command` for non-blocking execution. The gateway inspects
//! nothing: exit code, stdout, and stderr are captured verbatim and handed to
//! the caller. No timeout is imposed — a hung network operation hangs the
//! awaiting sequence until the subprocess returns.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use quill_core::CommandResult;

use crate::error::{spawn_err, GitError};

/// Executes version-control subcommands against one working tree.
///
/// The trait seam exists so the Decision Engine can be driven by a scripted
/// gateway in tests; production code always uses [`GitGateway`].
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Run one subcommand. `Ok` with a non-zero `exit_code` is a command
    /// failure; `Err` means the subprocess never ran.
    async fn execute(&self, args: &[&str]) -> Result<CommandResult, GitError>;
}

/// The real gateway: spawns `git -C <repo> <args…>`.
#[derive(Debug, Clone)]
pub struct GitGateway {
    repo: PathBuf,
    program: String,
}

impl GitGateway {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            program: "git".to_string(),
        }
    }

    /// Override the executable. Used by tests to substitute a stand-in
    /// program for `git`.
    pub fn with_program(repo: impl Into<PathBuf>, program: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            program: program.into(),
        }
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }
}

#[async_trait]
impl Gateway for GitGateway {
    async fn execute(&self, args: &[&str]) -> Result<CommandResult, GitError> {
        tracing::debug!(command = %args.join(" "), repo = %self.repo.display(), "exec");

        let output = Command::new(&self.program)
            .arg("-C")
            .arg(&self.repo)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| spawn_err(args, e))?;

        // Killed-by-signal has no exit code; fold it into the failure space.
        let exit_code = output.status.code().unwrap_or(-1);
        let result = CommandResult {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            timed_out: false,
        };

        if !result.success() {
            tracing::warn!(
                command = %args.join(" "),
                exit_code,
                stderr = %result.stderr.trim(),
                "command failed",
            );
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_zero_exit() {
        let gw = GitGateway::with_program("/tmp", "echo");
        let result = gw.execute(&["status", "--porcelain"]).await.expect("exec");
        assert!(result.success());
        // echo prints every argument it was handed, including the -C pair.
        assert!(result.stdout.contains("status --porcelain"));
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_result_not_an_error() {
        let gw = GitGateway::with_program("/tmp", "false");
        let result = gw.execute(&["pull"]).await.expect("exec");
        assert!(!result.success());
        assert_ne!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let gw = GitGateway::with_program("/tmp", "quill-test-no-such-binary");
        let err = gw.execute(&["status"]).await.unwrap_err();
        assert!(matches!(err, GitError::Spawn { .. }));
        assert!(err.to_string().contains("status"));
    }
}

//! Error types for quill-git.

use thiserror::Error;

/// Failures at the subprocess boundary.
///
/// A version-control command that *runs* and exits non-zero is not an error
/// here — that outcome is carried in `CommandResult` and classified by the
/// engine. `GitError` means the command could not be executed at all.
#[derive(Debug, Error)]
pub enum GitError {
    /// The subprocess could not be spawned or awaited.
    #[error("failed to run `git {command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn spawn_err(args: &[&str], source: std::io::Error) -> GitError {
    GitError::Spawn {
        command: args.join(" "),
        source,
    }
}

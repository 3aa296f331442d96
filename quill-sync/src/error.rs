//! Error types for quill-sync.

use thiserror::Error;

use quill_core::ConfigError;
use quill_git::GitError;

/// All errors that can arise from sync orchestration.
///
/// Step failures inside a sequence are NOT errors at this level — they are
/// folded into `SyncOutcome::was_error` and surfaced as messages. `SyncError`
/// covers the plumbing around a sequence: settings, runtime construction,
/// and a gateway that cannot run commands at all.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the command gateway (subprocess could not run).
    #[error("git gateway error: {0}")]
    Git(#[from] GitError),

    /// An error from settings persistence.
    #[error("settings error: {0}")]
    Config(#[from] ConfigError),

    /// Runtime construction or other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

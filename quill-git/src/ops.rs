//! Thin wrappers over the subcommand surface the engine drives.
//!
//! One function per subcommand keeps the full argument-vector surface in one
//! place; nothing here interprets output beyond handing back `CommandResult`.

use chrono::Utc;

use quill_core::CommandResult;

use crate::error::GitError;
use crate::gateway::Gateway;

/// Tag prefixed to generated commit messages.
pub const COMMIT_TAG: &str = "quill";

/// Working-tree status, porcelain format. Empty stdout means clean.
pub async fn status(gw: &dyn Gateway) -> Result<CommandResult, GitError> {
    gw.execute(&["status", "--porcelain"]).await
}

/// Refresh remote-tracking refs from the configured remote.
pub async fn fetch(gw: &dyn Gateway) -> Result<CommandResult, GitError> {
    gw.execute(&["fetch"]).await
}

/// Head commit identifier of the local branch.
pub async fn rev_parse_head(gw: &dyn Gateway) -> Result<CommandResult, GitError> {
    gw.execute(&["rev-parse", "HEAD"]).await
}

/// Head commit identifier of the upstream-tracking branch.
pub async fn rev_parse_upstream(gw: &dyn Gateway) -> Result<CommandResult, GitError> {
    gw.execute(&["rev-parse", "@{u}"]).await
}

pub async fn pull(gw: &dyn Gateway) -> Result<CommandResult, GitError> {
    gw.execute(&["pull"]).await
}

pub async fn push(gw: &dyn Gateway) -> Result<CommandResult, GitError> {
    gw.execute(&["push"]).await
}

/// Stage everything and commit with the given message.
pub async fn commit(gw: &dyn Gateway, message: &str) -> Result<CommandResult, GitError> {
    gw.execute(&["commit", "-a", "-m", message]).await
}

/// Check out a ref or pathspec (e.g. `.` to discard local edits).
pub async fn checkout(gw: &dyn Gateway, target: &str) -> Result<CommandResult, GitError> {
    gw.execute(&["checkout", target]).await
}

/// Recent history, one line per commit.
pub async fn log(gw: &dyn Gateway) -> Result<CommandResult, GitError> {
    gw.execute(&["log", "--oneline", "-10"]).await
}

/// Generated commit message: `[quill:commit] <ISO-8601 UTC timestamp>`.
pub fn commit_message() -> String {
    format!(
        "[{COMMIT_TAG}:commit] {}",
        Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Records every argument vector and answers with exit 0.
    #[derive(Default)]
    struct RecordingGateway {
        calls: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl Gateway for RecordingGateway {
        async fn execute(&self, args: &[&str]) -> Result<CommandResult, GitError> {
            self.calls
                .lock()
                .expect("calls lock")
                .push(args.iter().map(|s| s.to_string()).collect());
            Ok(CommandResult {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
                timed_out: false,
            })
        }
    }

    #[tokio::test]
    async fn wrappers_issue_expected_argument_vectors() {
        let gw = RecordingGateway::default();

        status(&gw).await.expect("status");
        fetch(&gw).await.expect("fetch");
        rev_parse_head(&gw).await.expect("rev-parse HEAD");
        rev_parse_upstream(&gw).await.expect("rev-parse @{u}");
        pull(&gw).await.expect("pull");
        push(&gw).await.expect("push");
        commit(&gw, "[quill:commit] msg").await.expect("commit");
        checkout(&gw, ".").await.expect("checkout");
        log(&gw).await.expect("log");

        let calls = gw.calls.lock().expect("calls lock");
        assert_eq!(calls[0], vec!["status", "--porcelain"]);
        assert_eq!(calls[1], vec!["fetch"]);
        assert_eq!(calls[2], vec!["rev-parse", "HEAD"]);
        assert_eq!(calls[3], vec!["rev-parse", "@{u}"]);
        assert_eq!(calls[4], vec!["pull"]);
        assert_eq!(calls[5], vec!["push"]);
        assert_eq!(calls[6], vec!["commit", "-a", "-m", "[quill:commit] msg"]);
        assert_eq!(calls[7], vec!["checkout", "."]);
        assert_eq!(calls[8], vec!["log", "--oneline", "-10"]);
    }

    #[test]
    fn commit_message_carries_tag_and_timestamp() {
        let msg = commit_message();
        assert!(msg.starts_with("[quill:commit] "));
        let stamp = msg.trim_start_matches("[quill:commit] ");
        // RFC 3339 UTC: 2026-08-06T12:34:56.789Z
        assert!(stamp.ends_with('Z'), "timestamp must be UTC: {stamp}");
        assert_eq!(&stamp[4..5], "-");
        assert_eq!(&stamp[10..11], "T");
    }
}

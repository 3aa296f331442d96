//! Decision Engine — chooses and runs the minimal reconciliation sequence.
//!
//! State machine over `(local_dirty, remote_ahead)`:
//!
//! | local_dirty | remote_ahead | sequence                                   |
//! |-------------|--------------|--------------------------------------------|
//! | false       | false        | none                                       |
//! | false       | true         | pull                                       |
//! | true        | false        | commit, push                               |
//! | true        | true         | commit, pull, retry commit once, then push |
//!
//! Committing first captures local work before the incoming pull can disturb
//! it; if the remote advanced between the oracle read and the commit attempt
//! the first commit may fail, so the pull runs anyway and the commit is
//! retried exactly once. Push only runs when every preceding step in the
//! active branch succeeded — pushing an indeterminate tree is avoided.

use std::sync::Arc;

use quill_core::{CommandResult, DivergenceState, IndicatorState, RemoteComparison, SyncOutcome};
use quill_git::{ops, Gateway, GitError};

use crate::guard::SyncGuard;
use crate::notify::{Indicator, Notice, Notifier};
use crate::status::StatusOracle;

// ---------------------------------------------------------------------------
// Outcome messages (host-visible literals)
// ---------------------------------------------------------------------------

pub const MSG_NO_CHANGES: &str = "No changes — already synced";
pub const MSG_PULLED: &str = "Remote changes pulled to local";
pub const MSG_PUSHED: &str = "Local changes pushed to remote";
pub const MSG_PULLED_THEN_PUSHED: &str = "Remote changes pulled, then local changes pushed";
pub const MSG_SYNCING: &str = "Syncing files with remote…";
pub const MSG_REMOTE_UNAVAILABLE: &str = "Unable to check remote files, please wait and try again";
pub const MSG_SYNC_ERROR: &str = "Error syncing files";
pub const MSG_SYNCED_WHILE_AWAY: &str = "Files synced while you were away";

const NOTICE_SYNCING_SECS: u64 = 5;
const NOTICE_UNKNOWN_SECS: u64 = 3;
const NOTICE_OUTCOME_SECS: u64 = 8;

// ---------------------------------------------------------------------------
// Sequence results
// ---------------------------------------------------------------------------

/// What happened to one trigger's attempt at a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAttempt {
    /// The guard was held; the trigger was dropped without running anything.
    Skipped,
    /// Remote divergence could not be determined; aborted before any
    /// mutation, warning surfaced. Not a completion — the throttle
    /// timestamp must not advance.
    Aborted(SyncOutcome),
    /// The sequence ran to its end (successfully or with `was_error`).
    Completed(SyncOutcome),
}

impl SyncAttempt {
    /// The outcome of a completed, non-errored sequence.
    pub fn completed_ok(&self) -> Option<&SyncOutcome> {
        match self {
            SyncAttempt::Completed(outcome) if !outcome.was_error => Some(outcome),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Owns one working tree's sync sequences. All state is instance-scoped so
/// tests can run independent engines side by side.
pub struct SyncEngine {
    gateway: Arc<dyn Gateway>,
    guard: Arc<SyncGuard>,
    oracle: StatusOracle,
    notifier: Arc<dyn Notifier>,
    indicator: Indicator,
}

impl SyncEngine {
    pub fn new(gateway: Arc<dyn Gateway>, notifier: Arc<dyn Notifier>) -> Self {
        let guard = SyncGuard::new();
        let indicator = Indicator::new();
        let oracle = StatusOracle::new(
            Arc::clone(&gateway),
            Arc::clone(&guard),
            indicator.clone(),
        );
        Self {
            gateway,
            guard,
            oracle,
            notifier,
            indicator,
        }
    }

    pub fn guard(&self) -> &Arc<SyncGuard> {
        &self.guard
    }

    pub fn oracle(&self) -> &StatusOracle {
        &self.oracle
    }

    pub fn indicator(&self) -> &Indicator {
        &self.indicator
    }

    /// Run one sync sequence if no other is in flight.
    ///
    /// Guard lifecycle: acquired here, released on every exit path via the
    /// permit. A trigger that finds the guard held is dropped (logged, not
    /// surfaced).
    pub async fn sync_once(&self) -> SyncAttempt {
        let Some(_permit) = self.guard.try_acquire() else {
            tracing::info!("sync already in progress, trigger dropped");
            return SyncAttempt::Skipped;
        };
        self.run_sequence().await
    }

    async fn run_sequence(&self) -> SyncAttempt {
        let local = match self.oracle.check_local_status().await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(error = %err, "local status could not run");
                return self.errored_outcome().await;
            }
        };
        if !local.success() {
            tracing::error!(stderr = %local.stderr.trim(), "local status failed");
            return self.errored_outcome().await;
        }
        let local_dirty = !StatusOracle::is_clean(&local);

        let remote_ahead = match self.oracle.compare_remote().await {
            RemoteComparison::UpToDate => false,
            RemoteComparison::Diverged => true,
            RemoteComparison::Unknown => {
                self.notifier
                    .notify(Notice::warning(MSG_REMOTE_UNAVAILABLE, NOTICE_UNKNOWN_SECS));
                return SyncAttempt::Aborted(SyncOutcome {
                    message: MSG_REMOTE_UNAVAILABLE.to_string(),
                    was_error: false,
                    was_pulled: false,
                });
            }
        };

        let divergence = DivergenceState {
            local_dirty,
            remote_ahead,
        };

        let outcome = if divergence.in_sync() {
            SyncOutcome {
                message: MSG_NO_CHANGES.to_string(),
                was_error: false,
                was_pulled: false,
            }
        } else {
            self.indicator.set(IndicatorState::Loading);
            self.notifier
                .notify(Notice::info(MSG_SYNCING, NOTICE_SYNCING_SECS));
            self.run_operations(divergence).await
        };

        // Exactly one outcome message per completed sequence.
        let notice = if outcome.was_error {
            Notice::warning(MSG_SYNC_ERROR, NOTICE_OUTCOME_SECS)
        } else {
            Notice::success(outcome.message.clone(), NOTICE_OUTCOME_SECS)
        };
        self.notifier.notify(notice);

        // Indicator reflects true post-sequence dirtiness, not an assumption
        // from the branch taken.
        if let Err(err) = self.oracle.check_local_status().await {
            tracing::warn!(error = %err, "post-sequence status refresh failed");
        }

        tracing::info!(
            message = %outcome.message,
            was_error = outcome.was_error,
            was_pulled = outcome.was_pulled,
            "sequence complete",
        );
        SyncAttempt::Completed(outcome)
    }

    async fn run_operations(&self, divergence: DivergenceState) -> SyncOutcome {
        let mut outcome = SyncOutcome {
            message: MSG_SYNC_ERROR.to_string(),
            was_error: false,
            was_pulled: false,
        };

        match (divergence.local_dirty, divergence.remote_ahead) {
            // Remote advanced, local clean: pull only.
            (false, true) => {
                let pull = self.step("pull", ops::pull(&*self.gateway).await);
                if pull.success() {
                    outcome.was_pulled = true;
                    outcome.message = MSG_PULLED.to_string();
                } else {
                    outcome.was_error = true;
                }
            }

            // Local changed, remote current: commit then push.
            (true, false) => {
                let commit = self
                    .step("commit", ops::commit(&*self.gateway, &ops::commit_message()).await);
                if !commit.success() {
                    outcome.was_error = true;
                    return outcome;
                }
                let push = self.step("push", ops::push(&*self.gateway).await);
                if push.success() {
                    outcome.message = MSG_PUSHED.to_string();
                } else {
                    outcome.was_error = true;
                }
            }

            // Both diverged: commit to capture local work, pull, retry the
            // commit once if the remote raced it, push only if both held.
            (true, true) => {
                let mut commit = self
                    .step("commit", ops::commit(&*self.gateway, &ops::commit_message()).await);
                let pull = self.step("pull", ops::pull(&*self.gateway).await);
                if !commit.success() {
                    commit = self.step(
                        "commit-retry",
                        ops::commit(&*self.gateway, &ops::commit_message()).await,
                    );
                }
                if pull.success() {
                    outcome.was_pulled = true;
                }
                if pull.success() && commit.success() {
                    let push = self.step("push", ops::push(&*self.gateway).await);
                    if push.success() {
                        outcome.message = MSG_PULLED_THEN_PUSHED.to_string();
                    } else {
                        outcome.was_error = true;
                    }
                } else {
                    outcome.was_error = true;
                }
            }

            (false, false) => unreachable!("in-sync state never reaches operations"),
        }

        outcome
    }

    /// Commit-and-push for host hide events (`push_on_hide`). Guarded like a
    /// sequence but silent: no notices, log only.
    pub async fn commit_and_push(&self) -> SyncAttempt {
        let Some(_permit) = self.guard.try_acquire() else {
            tracing::info!("sync already in progress, commit-and-push dropped");
            return SyncAttempt::Skipped;
        };

        let mut outcome = SyncOutcome {
            message: MSG_NO_CHANGES.to_string(),
            was_error: false,
            was_pulled: false,
        };

        let local = match self.oracle.check_local_status().await {
            Ok(result) if result.success() => result,
            Ok(result) => {
                tracing::error!(stderr = %result.stderr.trim(), "local status failed");
                outcome.was_error = true;
                outcome.message = MSG_SYNC_ERROR.to_string();
                return SyncAttempt::Completed(outcome);
            }
            Err(err) => {
                tracing::error!(error = %err, "local status could not run");
                outcome.was_error = true;
                outcome.message = MSG_SYNC_ERROR.to_string();
                return SyncAttempt::Completed(outcome);
            }
        };

        if !StatusOracle::is_clean(&local) {
            self.indicator.set(IndicatorState::Loading);
            let commit = self
                .step("commit", ops::commit(&*self.gateway, &ops::commit_message()).await);
            if commit.success() {
                let push = self.step("push", ops::push(&*self.gateway).await);
                if push.success() {
                    outcome.message = MSG_PUSHED.to_string();
                } else {
                    outcome.was_error = true;
                    outcome.message = MSG_SYNC_ERROR.to_string();
                }
            } else {
                outcome.was_error = true;
                outcome.message = MSG_SYNC_ERROR.to_string();
            }
        }

        if let Err(err) = self.oracle.check_local_status().await {
            tracing::warn!(error = %err, "post-sequence status refresh failed");
        }
        SyncAttempt::Completed(outcome)
    }

    /// Abort a sequence that failed before any divergence decision.
    async fn errored_outcome(&self) -> SyncAttempt {
        self.notifier
            .notify(Notice::warning(MSG_SYNC_ERROR, NOTICE_OUTCOME_SECS));
        SyncAttempt::Completed(SyncOutcome {
            message: MSG_SYNC_ERROR.to_string(),
            was_error: true,
            was_pulled: false,
        })
    }

    /// Fold a gateway-level failure into the step-failure space so the
    /// sequence can inspect every step uniformly by exit code.
    fn step(&self, name: &str, result: Result<CommandResult, GitError>) -> CommandResult {
        match result {
            Ok(result) => {
                if !result.success() {
                    tracing::warn!(
                        step = name,
                        exit_code = result.exit_code,
                        stderr = %result.stderr.trim(),
                        "step failed",
                    );
                }
                result
            }
            Err(err) => {
                tracing::error!(step = name, error = %err, "step could not run");
                CommandResult {
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: err.to_string(),
                    timed_out: false,
                }
            }
        }
    }
}

//! Status Oracle — local dirtiness and local-vs-remote divergence.
//!
//! Divergence is recomputed from ground truth on every check; nothing here
//! caches repository state between queries.

use std::sync::Arc;

use serde::Serialize;

use quill_core::{CommandResult, IndicatorState, RemoteComparison};
use quill_git::{ops, Gateway, GitError};

use crate::guard::SyncGuard;
use crate::notify::Indicator;

/// Point-in-time view of both divergence axes, for status surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub local_dirty: bool,
    pub remote: RemoteComparison,
}

/// Answers "has the local replica changed?" and "has the remote advanced?".
#[derive(Clone)]
pub struct StatusOracle {
    gateway: Arc<dyn Gateway>,
    guard: Arc<SyncGuard>,
    indicator: Indicator,
}

impl StatusOracle {
    pub fn new(gateway: Arc<dyn Gateway>, guard: Arc<SyncGuard>, indicator: Indicator) -> Self {
        Self {
            gateway,
            guard,
            indicator,
        }
    }

    /// Run the working-tree status query. Whitespace-trimmed empty stdout
    /// means clean.
    ///
    /// Side effect: updates the passive indicator (Active/Inactive) — the
    /// badge is the user's signal of pending changes, so it must refresh
    /// even when this is called purely for status.
    pub async fn check_local_status(&self) -> Result<CommandResult, GitError> {
        let result = ops::status(&*self.gateway).await?;
        if result.success() {
            if Self::is_clean(&result) {
                self.indicator.set(IndicatorState::Inactive);
            } else {
                self.indicator.set(IndicatorState::Active);
            }
        }
        Ok(result)
    }

    /// True when `result` reports a clean working tree.
    pub fn is_clean(result: &CommandResult) -> bool {
        result.stdout.trim().is_empty()
    }

    /// Compare local and upstream-tracking heads after a network refresh.
    ///
    /// Fails open: while a sync sequence holds the guard this performs no
    /// network I/O and reports `Unknown` — the caller should abort and try
    /// again later rather than race the in-flight operations.
    pub async fn check_remote_divergence(&self) -> RemoteComparison {
        if self.guard.is_held() {
            tracing::info!("sync in progress, remote divergence unknown");
            return RemoteComparison::Unknown;
        }
        self.compare_remote().await
    }

    /// The unguarded comparison, used inside a sequence that already holds
    /// the guard. Any step that fails to produce a head identifier yields
    /// `Unknown` — never a guess at either concrete state.
    pub(crate) async fn compare_remote(&self) -> RemoteComparison {
        let fetch = match ops::fetch(&*self.gateway).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(error = %err, "fetch could not run");
                return RemoteComparison::Unknown;
            }
        };
        if !fetch.success() {
            tracing::warn!(stderr = %fetch.stderr.trim(), "fetch failed");
            return RemoteComparison::Unknown;
        }

        let local = match ops::rev_parse_head(&*self.gateway).await {
            Ok(result) if result.success() => result,
            Ok(result) => {
                tracing::warn!(stderr = %result.stderr.trim(), "rev-parse HEAD failed");
                return RemoteComparison::Unknown;
            }
            Err(err) => {
                tracing::warn!(error = %err, "rev-parse HEAD could not run");
                return RemoteComparison::Unknown;
            }
        };
        let upstream = match ops::rev_parse_upstream(&*self.gateway).await {
            Ok(result) if result.success() => result,
            Ok(result) => {
                tracing::warn!(stderr = %result.stderr.trim(), "rev-parse @{{u}} failed");
                return RemoteComparison::Unknown;
            }
            Err(err) => {
                tracing::warn!(error = %err, "rev-parse @{{u}} could not run");
                return RemoteComparison::Unknown;
            }
        };

        if local.stdout.trim() == upstream.stdout.trim() {
            RemoteComparison::UpToDate
        } else {
            RemoteComparison::Diverged
        }
    }

    /// Resolve both divergence axes together for status surfaces. Uses the
    /// guarded remote check, so it degrades to `Unknown` during a sequence.
    pub async fn snapshot(&self) -> Result<StatusSnapshot, GitError> {
        let local = self.check_local_status().await?;
        let remote = self.check_remote_divergence().await;
        Ok(StatusSnapshot {
            local_dirty: local.success() && !Self::is_clean(&local),
            remote,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quill_core::IndicatorState;

    use crate::testing::{fail, ok, ScriptedGateway};

    fn oracle(gateway: Arc<ScriptedGateway>) -> (StatusOracle, Arc<SyncGuard>, Indicator) {
        let guard = SyncGuard::new();
        let indicator = Indicator::new();
        let oracle = StatusOracle::new(gateway, Arc::clone(&guard), indicator.clone());
        (oracle, guard, indicator)
    }

    #[tokio::test]
    async fn local_status_sets_indicator_active_when_dirty() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.respond("status", ok(" M pages/today.md\n"));
        let (oracle, _guard, indicator) = oracle(gateway);

        let result = oracle.check_local_status().await.expect("status");
        assert!(!StatusOracle::is_clean(&result));
        assert_eq!(indicator.current(), IndicatorState::Active);
    }

    #[tokio::test]
    async fn local_status_sets_indicator_inactive_when_clean() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.respond("status", ok("  \n"));
        let (oracle, _guard, indicator) = oracle(gateway);
        indicator.set(IndicatorState::Active);

        let result = oracle.check_local_status().await.expect("status");
        assert!(StatusOracle::is_clean(&result), "whitespace-only is clean");
        assert_eq!(indicator.current(), IndicatorState::Inactive);
    }

    #[tokio::test]
    async fn remote_check_matches_identical_heads() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.respond("rev-parse", ok("f3a9c81\n"));
        gateway.respond("rev-parse", ok("f3a9c81\n"));
        let (oracle, _guard, _indicator) = oracle(gateway);

        assert_eq!(
            oracle.check_remote_divergence().await,
            RemoteComparison::UpToDate
        );
    }

    #[tokio::test]
    async fn remote_check_detects_divergence() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.respond("rev-parse", ok("f3a9c81\n"));
        gateway.respond("rev-parse", ok("0be77d2\n"));
        let (oracle, _guard, _indicator) = oracle(gateway);

        assert_eq!(
            oracle.check_remote_divergence().await,
            RemoteComparison::Diverged
        );
    }

    #[tokio::test]
    async fn remote_check_is_unknown_while_guard_held() {
        let gateway = Arc::new(ScriptedGateway::new());
        let (oracle, guard, _indicator) = oracle(Arc::clone(&gateway));

        let _permit = guard.try_acquire().expect("acquire");
        assert_eq!(
            oracle.check_remote_divergence().await,
            RemoteComparison::Unknown
        );
        assert!(
            gateway.calls().is_empty(),
            "no network I/O may run under a held guard"
        );
    }

    #[tokio::test]
    async fn failed_fetch_yields_unknown() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.respond("fetch", fail(128));
        let (oracle, _guard, _indicator) = oracle(gateway);

        assert_eq!(
            oracle.check_remote_divergence().await,
            RemoteComparison::Unknown
        );
    }

    #[tokio::test]
    async fn failed_upstream_rev_parse_yields_unknown() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.respond("rev-parse", ok("f3a9c81\n"));
        gateway.respond("rev-parse", fail(128));
        let (oracle, _guard, _indicator) = oracle(gateway);

        assert_eq!(
            oracle.check_remote_divergence().await,
            RemoteComparison::Unknown
        );
    }

    #[tokio::test]
    async fn snapshot_resolves_both_axes_together() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.respond("status", ok(" M pages/today.md\n"));
        gateway.respond("rev-parse", ok("f3a9c81\n"));
        gateway.respond("rev-parse", ok("f3a9c81\n"));
        let (oracle, _guard, _indicator) = oracle(gateway);

        let snapshot = oracle.snapshot().await.expect("snapshot");
        assert!(snapshot.local_dirty);
        assert_eq!(snapshot.remote, RemoteComparison::UpToDate);
    }
}

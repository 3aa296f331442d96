//! Domain types for the quill sync engine.
//!
//! Everything here is plain data. Divergence is always re-derived from the
//! working tree and remote; nothing in this module caches repository state.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Trigger sources
// ---------------------------------------------------------------------------

/// Where a sync trigger came from. Selects the throttle policy and nothing
/// else: `Auto` triggers are subject to the minimum-interval throttle,
/// `Click` (manual) triggers bypass it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerSource {
    Auto,
    Click,
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerSource::Auto => write!(f, "AUTO"),
            TriggerSource::Click => write!(f, "CLICK"),
        }
    }
}

// ---------------------------------------------------------------------------
// Command results
// ---------------------------------------------------------------------------

/// Outcome of one version-control subprocess invocation.
///
/// `exit_code == 0` is the only success signal the engine consumes; stdout
/// and stderr are advisory (logging and messaging). No timeout is imposed on
/// subprocesses, so `timed_out` is carried for the boundary contract but
/// never set by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    #[serde(default)]
    pub timed_out: bool,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

// ---------------------------------------------------------------------------
// Divergence
// ---------------------------------------------------------------------------

/// Comparison of local working tree and remote history, resolved together in
/// a single oracle pass. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivergenceState {
    /// Working tree has uncommitted changes.
    pub local_dirty: bool,
    /// Remote branch head differs from the upstream-tracking pointer after a
    /// network refresh.
    pub remote_ahead: bool,
}

impl DivergenceState {
    pub fn in_sync(&self) -> bool {
        !self.local_dirty && !self.remote_ahead
    }
}

/// Result of comparing the local branch head against the upstream-tracking
/// branch. `Unknown` must never be collapsed into either concrete state:
/// callers abort the current attempt and try again later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteComparison {
    UpToDate,
    Diverged,
    Unknown,
}

// ---------------------------------------------------------------------------
// Sequence outcome
// ---------------------------------------------------------------------------

/// Result returned to the caller of one completed sync sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    /// Human-readable summary, surfaced exactly once per sequence.
    pub message: String,
    pub was_error: bool,
    /// A pull that changed local state occurred. The scheduler uses this to
    /// decide whether to notify after an unfocused period.
    pub was_pulled: bool,
}

// ---------------------------------------------------------------------------
// Indicator and notifications
// ---------------------------------------------------------------------------

/// Ternary visual state of the passive sync indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorState {
    /// Working tree clean.
    #[default]
    Inactive,
    /// Uncommitted local changes.
    Active,
    /// A sync sequence is in flight.
    Loading,
}

impl fmt::Display for IndicatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorState::Inactive => write!(f, "inactive"),
            IndicatorState::Active => write!(f, "active"),
            IndicatorState::Loading => write!(f, "loading"),
        }
    }
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

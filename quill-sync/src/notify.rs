//! Notifier and indicator boundaries.
//!
//! The host application owns the actual message popups and the toolbar
//! badge; this module defines the shapes the engine produces. The daemon
//! fans notices out to subscribed host clients, the CLI logs them.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use quill_core::{IndicatorState, Severity};

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

/// One user-facing message. `timeout: None` means persistent (the host keeps
/// it on screen until dismissed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub text: String,
    pub severity: Severity,
    #[serde(with = "duration_secs")]
    pub timeout: Option<Duration>,
}

impl Notice {
    pub fn info(text: impl Into<String>, timeout_secs: u64) -> Self {
        Self::new(text, Severity::Info, Some(Duration::from_secs(timeout_secs)))
    }

    pub fn success(text: impl Into<String>, timeout_secs: u64) -> Self {
        Self::new(
            text,
            Severity::Success,
            Some(Duration::from_secs(timeout_secs)),
        )
    }

    pub fn warning(text: impl Into<String>, timeout_secs: u64) -> Self {
        Self::new(
            text,
            Severity::Warning,
            Some(Duration::from_secs(timeout_secs)),
        )
    }

    fn new(text: impl Into<String>, severity: Severity, timeout: Option<Duration>) -> Self {
        Self {
            text: text.into(),
            severity,
            timeout,
        }
    }
}

mod duration_secs {
    //! Serialize `Option<Duration>` as whole seconds (`0` = persistent).

    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.map(|d| d.as_secs()).unwrap_or(0))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok((secs > 0).then(|| Duration::from_secs(secs)))
    }
}

/// Sink for user-facing messages.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Notifier that writes to the tracing log. Used by one-shot CLI runs and as
/// the fallback when no host client is subscribed.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            Severity::Warning => tracing::warn!(message = %notice.text, "notice"),
            _ => tracing::info!(message = %notice.text, "notice"),
        }
    }
}

// ---------------------------------------------------------------------------
// Indicator
// ---------------------------------------------------------------------------

/// Shared handle on the ternary visual indicator. Cheap to clone; observers
/// subscribe for changes, producers overwrite the current state.
#[derive(Debug, Clone)]
pub struct Indicator {
    tx: watch::Sender<IndicatorState>,
}

impl Default for Indicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(IndicatorState::Inactive);
        Self { tx }
    }

    pub fn set(&self, state: IndicatorState) {
        // send_replace never fails, even with zero subscribers.
        let previous = self.tx.send_replace(state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "indicator");
        }
    }

    pub fn current(&self) -> IndicatorState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<IndicatorState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_timeout_zero_is_persistent_on_the_wire() {
        let persistent = Notice {
            text: "changes detected".into(),
            severity: Severity::Success,
            timeout: None,
        };
        let json = serde_json::to_value(&persistent).expect("serialize");
        assert_eq!(json["timeout"], 0);

        let back: Notice = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back.timeout, None);

        let timed = Notice::warning("slow down", 3);
        let json = serde_json::to_value(&timed).expect("serialize");
        assert_eq!(json["timeout"], 3);
    }

    #[test]
    fn indicator_set_and_observe() {
        let indicator = Indicator::new();
        assert_eq!(indicator.current(), IndicatorState::Inactive);

        let mut rx = indicator.subscribe();
        indicator.set(IndicatorState::Loading);
        assert_eq!(indicator.current(), IndicatorState::Loading);
        assert!(rx.has_changed().expect("watch alive"));
    }
}

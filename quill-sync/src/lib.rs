//! # quill-sync
//!
//! Sync orchestration: Status Oracle, Sync Guard, and the Decision Engine
//! that reconciles a local working tree with its remote.
//!
//! Call [`SyncEngine::sync_once`] to run one guarded sequence, or the
//! [`oneshot`] helpers for blocking one-shot use.

pub mod engine;
pub mod error;
pub mod guard;
pub mod notify;
pub mod oneshot;
pub mod status;
pub mod testing;

pub use engine::{
    SyncAttempt, SyncEngine, MSG_NO_CHANGES, MSG_PULLED, MSG_PULLED_THEN_PUSHED, MSG_PUSHED,
    MSG_REMOTE_UNAVAILABLE, MSG_SYNCED_WHILE_AWAY, MSG_SYNCING, MSG_SYNC_ERROR,
};
pub use error::SyncError;
pub use guard::{SyncGuard, SyncPermit};
pub use notify::{Indicator, Notice, Notifier, TracingNotifier};
pub use status::{StatusOracle, StatusSnapshot};

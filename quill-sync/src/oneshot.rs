//! One-shot blocking entry points for callers without a runtime.
//!
//! The CLI runs a single sequence (or status snapshot) against a fresh
//! engine and exits; the runtime is built here, at the blocking seam, on a
//! current-thread scheduler — sync logic never executes in parallel.

use std::sync::Arc;

use quill_core::Settings;
use quill_git::GitGateway;

use crate::engine::{SyncAttempt, SyncEngine};
use crate::error::SyncError;
use crate::notify::{Notifier, TracingNotifier};
use crate::status::StatusSnapshot;

fn runtime() -> Result<tokio::runtime::Runtime, SyncError> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

fn engine_for(settings: &Settings) -> SyncEngine {
    let gateway = Arc::new(GitGateway::new(&settings.repo));
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    SyncEngine::new(gateway, notifier)
}

/// Run one sync sequence to completion and return the attempt result.
pub fn sync_once_blocking(settings: &Settings) -> Result<SyncAttempt, SyncError> {
    let engine = engine_for(settings);
    Ok(runtime()?.block_on(engine.sync_once()))
}

/// Resolve a status snapshot (local dirtiness + remote divergence).
pub fn snapshot_blocking(settings: &Settings) -> Result<StatusSnapshot, SyncError> {
    let engine = engine_for(settings);
    Ok(runtime()?.block_on(engine.oracle().snapshot())?)
}

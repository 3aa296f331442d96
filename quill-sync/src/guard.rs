//! Sync Guard — the single mutual-exclusion flag over sync sequences.
//!
//! Overlapping pull/commit/push sequences against one working tree can
//! corrupt state or issue misleading duplicate operations, so at most one
//! sequence may be in flight. Acquisition is non-blocking: a trigger that
//! finds the guard held is dropped, never queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-wide flag, true for the entire duration of one in-flight sync
/// sequence. Constructed per engine instance so tests can run independent
/// engines side by side.
#[derive(Debug, Default)]
pub struct SyncGuard {
    held: AtomicBool,
}

impl SyncGuard {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Non-blocking acquire. Returns a permit that releases the guard when
    /// dropped — covering every exit path of a sequence without per-path
    /// bookkeeping.
    pub fn try_acquire(self: &Arc<Self>) -> Option<SyncPermit> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncPermit {
                guard: Arc::clone(self),
            })
    }

    /// True while a sequence holds the guard. Read by the remote-divergence
    /// check to fail open instead of racing in-flight operations.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    /// Idempotent release. Normally invoked by [`SyncPermit::drop`].
    pub fn release(&self) {
        self.held.store(false, Ordering::Release);
    }
}

/// RAII handle for one held guard.
#[derive(Debug)]
pub struct SyncPermit {
    guard: Arc<SyncGuard>,
}

impl Drop for SyncPermit {
    fn drop(&mut self) {
        self.guard.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_is_exclusive_until_released() {
        let guard = SyncGuard::new();
        let permit = guard.try_acquire().expect("first acquire");
        assert!(guard.is_held());
        assert!(guard.try_acquire().is_none(), "second acquire must fail");

        drop(permit);
        assert!(!guard.is_held());
        assert!(guard.try_acquire().is_some(), "reacquire after release");
    }

    #[test]
    fn release_is_idempotent() {
        let guard = SyncGuard::new();
        let permit = guard.try_acquire().expect("acquire");
        drop(permit);
        guard.release();
        guard.release();
        assert!(!guard.is_held());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn permit_releases_on_early_return() {
        let guard = SyncGuard::new();

        fn early_exit(guard: &Arc<SyncGuard>) -> Option<()> {
            let _permit = guard.try_acquire()?;
            None // simulated abort path
        }

        assert!(early_exit(&guard).is_none());
        assert!(!guard.is_held(), "guard must be free after early return");
    }
}

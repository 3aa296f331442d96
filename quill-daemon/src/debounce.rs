//! Generic coalescing timer.
//!
//! Wraps an async action and a delay: each call cancels any still-pending
//! execution and schedules a new one after the delay elapses with no further
//! calls (last-call-wins, never queued). The debouncer knows nothing about
//! what it wraps.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Handle on one debounced action. Dropping it cancels any pending
/// execution.
#[derive(Debug)]
pub struct Debouncer {
    tx: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
}

impl Debouncer {
    /// Must be called from within a tokio runtime.
    pub fn new<F, Fut>(delay: Duration, action: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let task = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                // A pending timer restarts on every further call.
                loop {
                    tokio::select! {
                        again = rx.recv() => {
                            if again.is_none() {
                                return;
                            }
                        }
                        _ = sleep(delay) => {
                            action().await;
                            break;
                        }
                    }
                }
            }
        });
        Self { tx, task }
    }

    /// Schedule (or reschedule) the wrapped action.
    pub fn call(&self) {
        let _ = self.tx.send(());
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

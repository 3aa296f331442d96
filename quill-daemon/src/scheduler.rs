//! Throttle/Scheduler — rate control layered over the Decision Engine.
//!
//! Two independent policies:
//! 1. Automatic triggers are dropped while less than the configured minimum
//!    interval has elapsed since the last successful completion; manual
//!    triggers always bypass the throttle.
//! 2. While the host is unfocused, one sequence runs immediately and then on
//!    a fixed period until focus returns. A pull during the unfocused period
//!    queues a one-time notification for the next refocus.
//!
//! The scheduler also owns the debounced status-only refresh that keeps the
//! passive indicator accurate without invoking the engine.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use quill_core::{Settings, TriggerSource};
use quill_sync::{Notice, Notifier, SyncAttempt, SyncEngine, MSG_SYNCED_WHILE_AWAY};

use crate::debounce::Debouncer;
use crate::paths::STATUS_DEBOUNCE_WINDOW;

/// Resync period while the host stays unfocused.
pub const BLUR_RESYNC_INTERVAL: Duration = Duration::from_secs(300);

const NOTICE_AWAY_SECS: u64 = 4;

// ---------------------------------------------------------------------------
// Host events
// ---------------------------------------------------------------------------

/// Events forwarded by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Focus,
    Blur,
    RouteChange,
    DataChange,
    Hide,
}

impl FromStr for HostEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "focus" => Ok(HostEvent::Focus),
            "blur" => Ok(HostEvent::Blur),
            "route-change" => Ok(HostEvent::RouteChange),
            "data-change" => Ok(HostEvent::DataChange),
            "hide" => Ok(HostEvent::Hide),
            other => Err(format!(
                "unknown host event '{other}'; expected: focus, blur, route-change, data-change, hide"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct Scheduler {
    engine: Arc<SyncEngine>,
    settings: Settings,
    notifier: Arc<dyn Notifier>,
    /// Monotonic timestamp of the last successful completion (throttle math).
    last_sync: Mutex<Option<Instant>>,
    /// Wall-clock twin of `last_sync` for status surfaces; 0 = never.
    last_sync_unix: AtomicU64,
    pulled_while_blurred: AtomicBool,
    blur_task: Mutex<Option<JoinHandle<()>>>,
    status_refresh: Debouncer,
}

impl Scheduler {
    /// Must be called from within a tokio runtime (spawns the debounce task).
    pub fn new(engine: Arc<SyncEngine>, settings: Settings, notifier: Arc<dyn Notifier>) -> Self {
        let status_refresh = {
            let engine = Arc::clone(&engine);
            Debouncer::new(STATUS_DEBOUNCE_WINDOW, move || {
                let engine = Arc::clone(&engine);
                async move {
                    if let Err(err) = engine.oracle().check_local_status().await {
                        tracing::warn!(error = %err, "debounced status refresh failed");
                    }
                }
            })
        };

        Self {
            engine,
            settings,
            notifier,
            last_sync: Mutex::new(None),
            last_sync_unix: AtomicU64::new(0),
            pulled_while_blurred: AtomicBool::new(false),
            blur_task: Mutex::new(None),
            status_refresh,
        }
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Unix seconds of the last successful completion; 0 if none yet.
    pub fn last_sync_at_unix(&self) -> u64 {
        self.last_sync_unix.load(Ordering::Acquire)
    }

    fn min_interval(&self) -> Duration {
        Duration::from_secs(self.settings.sync_interval_secs)
    }

    /// Run one sequence through the throttle. `Auto` triggers are dropped
    /// inside the minimum interval; `Click` bypasses. The throttle timestamp
    /// advances only on a successful (non-error) completion.
    pub async fn sync_files(&self, trigger: TriggerSource) -> SyncAttempt {
        tracing::info!(trigger = %trigger, "sync requested");

        if trigger == TriggerSource::Auto {
            let since_last = self
                .last_sync
                .lock()
                .expect("last_sync lock")
                .map(|at| at.elapsed());
            if let Some(elapsed) = since_last {
                if elapsed < self.min_interval() {
                    tracing::info!(elapsed_secs = elapsed.as_secs(), "synced too soon, sync stopped");
                    return SyncAttempt::Skipped;
                }
            }
        }

        let attempt = self.engine.sync_once().await;
        if attempt.completed_ok().is_some() {
            *self.last_sync.lock().expect("last_sync lock") = Some(Instant::now());
            self.last_sync_unix
                .store(unix_seconds_now(), Ordering::Release);
        }
        attempt
    }

    /// Host lost focus: run one sequence now, then resync on a fixed period
    /// until focus returns.
    pub fn on_blur(self: &Arc<Self>) {
        self.pulled_while_blurred.store(false, Ordering::SeqCst);
        if !self.settings.auto_sync {
            return;
        }

        let scheduler = Arc::clone(self);
        let task = tokio::spawn(async move {
            let attempt = scheduler.sync_files(TriggerSource::Auto).await;
            scheduler.record_pull(&attempt);

            let mut ticks = interval_at(
                Instant::now() + BLUR_RESYNC_INTERVAL,
                BLUR_RESYNC_INTERVAL,
            );
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                let attempt = scheduler.sync_files(TriggerSource::Auto).await;
                scheduler.record_pull(&attempt);
            }
        });

        if let Some(previous) = self
            .blur_task
            .lock()
            .expect("blur_task lock")
            .replace(task)
        {
            previous.abort();
        }
    }

    /// Host regained focus: cancel the pending resync timer and, if a
    /// blur-period pull changed local state, show the away notification once.
    pub fn on_focus(&self) {
        if let Some(task) = self.blur_task.lock().expect("blur_task lock").take() {
            task.abort();
            tracing::debug!("blur resync cancelled");
        }

        if self.pulled_while_blurred.swap(false, Ordering::SeqCst) {
            self.notifier
                .notify(Notice::success(MSG_SYNCED_WHILE_AWAY, NOTICE_AWAY_SECS));
        }
    }

    /// Host route changed: debounced status-only refresh.
    pub fn on_route_change(&self) {
        self.status_refresh.call();
    }

    /// Host data changed: debounced status-only refresh, if enabled.
    pub fn on_data_change(&self) {
        if self.settings.check_on_data_change {
            self.status_refresh.call();
        }
    }

    /// Host window hidden: commit and push local work, if enabled.
    pub async fn on_hide(&self) {
        if !self.settings.push_on_hide {
            return;
        }
        let attempt = self.engine.commit_and_push().await;
        tracing::info!(?attempt, "hide commit-and-push finished");
    }

    fn record_pull(&self, attempt: &SyncAttempt) {
        if let SyncAttempt::Completed(outcome) = attempt {
            if outcome.was_pulled {
                self.pulled_while_blurred.store(true, Ordering::SeqCst);
            }
        }
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use std::path::{Path, PathBuf};
use std::time::Duration;

use quill_core::config::quill_root_at;

/// Window for coalescing rapid status-refresh triggers (route changes,
/// data-change bursts) into one check.
pub const STATUS_DEBOUNCE_WINDOW: Duration = Duration::from_secs(2);

pub const DAEMON_SOCKET: &str = "quill.sock";
pub const DAEMON_LOG: &str = "quill.log";

pub fn run_dir(home: &Path) -> PathBuf {
    quill_root_at(home).join("run")
}

pub fn socket_path(home: &Path) -> PathBuf {
    run_dir(home).join(DAEMON_SOCKET)
}

pub fn logs_dir(home: &Path) -> PathBuf {
    quill_root_at(home).join("logs")
}

pub fn log_path(home: &Path) -> PathBuf {
    logs_dir(home).join(DAEMON_LOG)
}

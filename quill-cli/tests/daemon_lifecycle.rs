//! Daemon lifecycle over the Unix socket: start, status, events, stop.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

use tempfile::TempDir;

fn quill_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_quill") {
        return PathBuf::from(path);
    }

    let this_test = std::env::current_exe().expect("current_exe");
    let deps_dir = this_test.parent().expect("deps dir");
    let debug_dir = deps_dir.parent().expect("debug dir");
    let direct = debug_dir.join("quill");
    assert!(
        direct.exists(),
        "unable to locate quill binary in target/debug"
    );
    direct
}

struct DaemonProcess {
    child: Child,
    binary: PathBuf,
    home: PathBuf,
}

impl DaemonProcess {
    fn start(binary: PathBuf, home: PathBuf) -> Self {
        let child = Command::new(&binary)
            .env("HOME", &home)
            .env("USERPROFILE", &home)
            .args(["daemon", "start"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn daemon");

        Self {
            child,
            binary,
            home,
        }
    }

    fn stop(&mut self) {
        let _ = Command::new(&self.binary)
            .env("HOME", &self.home)
            .env("USERPROFILE", &self.home)
            .args(["daemon", "stop"])
            .status();

        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if let Ok(Some(_)) = self.child.try_wait() {
                return;
            }
            sleep(Duration::from_millis(50));
        }

        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for DaemonProcess {
    fn drop(&mut self) {
        self.stop();
    }
}

fn daemon_status(binary: &Path, home: &Path) -> Option<serde_json::Value> {
    let output = Command::new(binary)
        .env("HOME", home)
        .env("USERPROFILE", home)
        .args(["daemon", "status"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    serde_json::from_slice(&output.stdout).ok()
}

fn daemon_running(binary: &Path, home: &Path) -> bool {
    daemon_status(binary, home)
        .and_then(|v| v.get("running").and_then(|r| r.as_bool()))
        .unwrap_or(false)
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(100));
    }
    false
}

#[test]
fn daemon_serves_status_and_stops_gracefully() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");
    let binary = quill_bin_path();

    // Register a working tree; auto-sync off keeps the daemon from racing
    // the assertions below with a startup sequence.
    let init = Command::new(&binary)
        .env("HOME", home.path())
        .env("USERPROFILE", home.path())
        .args(["init"])
        .arg(workspace.path())
        .args(["--no-auto-sync"])
        .output()
        .expect("run init");
    assert!(
        init.status.success(),
        "init failed: {}",
        String::from_utf8_lossy(&init.stderr)
    );

    let mut daemon = DaemonProcess::start(binary.clone(), home.path().to_path_buf());
    assert!(
        wait_until(Duration::from_secs(5), || daemon_running(
            &binary,
            home.path()
        )),
        "daemon did not report running state in time",
    );

    let status = daemon_status(&binary, home.path()).expect("status payload");
    assert_eq!(status["running"], serde_json::json!(true));
    assert_eq!(status["auto_sync"], serde_json::json!(false));
    assert_eq!(status["last_sync_at_unix"], serde_json::json!(0));
    assert!(status["indicator"].is_string());

    // Host events are accepted; unknown kinds are rejected.
    let blur = Command::new(&binary)
        .env("HOME", home.path())
        .env("USERPROFILE", home.path())
        .args(["event", "blur"])
        .output()
        .expect("send blur event");
    assert!(blur.status.success());

    let bogus = Command::new(&binary)
        .env("HOME", home.path())
        .env("USERPROFILE", home.path())
        .args(["event", "minimize"])
        .output()
        .expect("send bogus event");
    assert!(
        !bogus.status.success(),
        "unknown host events must be rejected"
    );

    daemon.stop();
    assert!(
        wait_until(Duration::from_secs(3), || !daemon_running(
            &binary,
            home.path()
        )),
        "daemon still reported running after stop",
    );
}

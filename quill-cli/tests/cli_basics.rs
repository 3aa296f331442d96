use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn quill(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("quill").expect("quill binary");
    cmd.env("HOME", home.path());
    cmd.env("USERPROFILE", home.path());
    cmd
}

#[test]
fn daemon_status_reports_not_running() {
    let home = TempDir::new().expect("home");

    quill(&home)
        .args(["daemon", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"running\": false"));
}

#[test]
fn init_writes_settings_and_is_idempotent() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");

    quill(&home)
        .args(["init"])
        .arg(workspace.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("registered working tree"));

    let config = home.path().join(".quill").join("config.yaml");
    assert!(config.exists(), "config.yaml written by init");

    // Re-init keeps the existing registration.
    let elsewhere = TempDir::new().expect("elsewhere");
    quill(&home)
        .args(["init"])
        .arg(elsewhere.path())
        .assert()
        .success();
    let contents = std::fs::read_to_string(&config).expect("read config");
    assert!(
        !contents.contains(&elsewhere.path().display().to_string()),
        "re-init must not clobber the registered working tree"
    );
}

#[test]
fn init_applies_flags() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");

    quill(&home)
        .args(["init"])
        .arg(workspace.path())
        .args(["--no-auto-sync", "--push-on-hide", "--interval", "120"])
        .assert()
        .success();

    let config = home.path().join(".quill").join("config.yaml");
    let contents = std::fs::read_to_string(config).expect("read config");
    assert!(contents.contains("auto_sync: false"));
    assert!(contents.contains("push_on_hide: true"));
    assert!(contents.contains("sync_interval_secs: 120"));
}

#[test]
fn status_without_settings_points_at_init() {
    let home = TempDir::new().expect("home");

    quill(&home)
        .args(["status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("quill init"));
}

#[test]
fn sync_without_settings_points_at_init() {
    let home = TempDir::new().expect("home");

    quill(&home)
        .args(["sync"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("quill init"));
}

//! `quill sync` — manual sync trigger.
//!
//! Routed to the daemon when one is running (so its guard and indicator
//! stay authoritative); otherwise a one-shot in-process sequence.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use quill_core::config;
use quill_daemon::{request_sync, DaemonError};
use quill_sync::{oneshot, SyncAttempt};

/// Arguments for `quill sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let home = dirs::home_dir().context("could not determine home directory")?;

        match request_sync(&home) {
            Ok(data) => {
                print_daemon_payload(&data);
                Ok(())
            }
            Err(DaemonError::DaemonNotRunning { .. }) => {
                let settings = config::load_at(&home)?;
                let attempt =
                    oneshot::sync_once_blocking(&settings).context("sync sequence failed")?;
                print_attempt(&attempt);
                Ok(())
            }
            Err(err) => Err(err).context("daemon sync request failed"),
        }
    }
}

fn print_daemon_payload(data: &serde_json::Value) {
    if data["skipped"].as_bool().unwrap_or(false) {
        println!("{}", "sync already in progress, trigger dropped".yellow());
        return;
    }
    let message = data["outcome"]["message"].as_str().unwrap_or("sync finished");
    let was_error = data["outcome"]["was_error"].as_bool().unwrap_or(false);
    if was_error || data["aborted"].as_bool().unwrap_or(false) {
        println!("{}", message.yellow());
    } else {
        println!("{} {}", "✓".green(), message);
    }
}

fn print_attempt(attempt: &SyncAttempt) {
    match attempt {
        SyncAttempt::Skipped => {
            println!("{}", "sync already in progress, trigger dropped".yellow());
        }
        SyncAttempt::Aborted(outcome) => println!("{}", outcome.message.yellow()),
        SyncAttempt::Completed(outcome) => {
            if outcome.was_error {
                println!("{}", outcome.message.yellow());
            } else {
                println!("{} {}", "✓".green(), outcome.message);
            }
        }
    }
}

//! `quill status` — divergence visibility.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::json;

use quill_core::{config, RemoteComparison};
use quill_daemon::{request_status, DaemonError};
use quill_sync::oneshot;

/// Arguments for `quill status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = dirs::home_dir().context("could not determine home directory")?;

        // Prefer the daemon's view: its indicator and guard are live.
        match request_status(&home) {
            Ok(payload) => {
                if self.json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&payload)
                            .context("failed to render status JSON")?
                    );
                } else {
                    print_daemon_status(&payload);
                }
                return Ok(());
            }
            Err(DaemonError::DaemonNotRunning { .. }) => {}
            Err(err) => return Err(err).context("failed to query daemon status"),
        }

        let settings = config::load_at(&home)?;
        let snapshot =
            oneshot::snapshot_blocking(&settings).context("status snapshot failed")?;

        if self.json {
            let payload = json!({
                "running": false,
                "repo": settings.repo.display().to_string(),
                "local_dirty": snapshot.local_dirty,
                "remote": snapshot.remote,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to render status JSON")?
            );
            return Ok(());
        }

        println!(
            "quill v{} | {} | daemon {}",
            env!("CARGO_PKG_VERSION"),
            settings.repo.display(),
            "not running".bright_black(),
        );
        println!("  local   {}", local_label(snapshot.local_dirty));
        println!("  remote  {}", remote_label(snapshot.remote));
        Ok(())
    }
}

fn print_daemon_status(payload: &serde_json::Value) {
    println!(
        "quill v{} | {} | daemon {}",
        env!("CARGO_PKG_VERSION"),
        payload["repo"].as_str().unwrap_or("?"),
        "running".green(),
    );
    println!(
        "  indicator  {}",
        payload["indicator"].as_str().unwrap_or("?")
    );
    println!(
        "  syncing    {}",
        if payload["guard_held"].as_bool().unwrap_or(false) {
            "in progress".yellow().to_string()
        } else {
            "idle".to_string()
        }
    );
    let last = payload["last_sync_at_unix"].as_u64().unwrap_or(0);
    if last == 0 {
        println!("  last sync  never");
    } else {
        println!("  last sync  {last} (unix)");
    }
}

fn local_label(dirty: bool) -> String {
    if dirty {
        "uncommitted changes".red().bold().to_string()
    } else {
        "clean".green().to_string()
    }
}

fn remote_label(remote: RemoteComparison) -> String {
    match remote {
        RemoteComparison::UpToDate => "up to date".green().to_string(),
        RemoteComparison::Diverged => "diverged".yellow().bold().to_string(),
        RemoteComparison::Unknown => "unknown — try again later".bright_black().to_string(),
    }
}

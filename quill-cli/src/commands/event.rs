//! `quill event` — forward a host event to the running daemon.
//!
//! Host applications shell out to this to report focus/blur/route/data
//! transitions; each maps to a scheduler entry point.

use anyhow::{Context, Result};
use clap::Args;

use quill_daemon::{send_event, DaemonError};

/// Arguments for `quill event`.
#[derive(Args, Debug)]
pub struct EventArgs {
    /// Event kind: focus, blur, route-change, data-change, or hide.
    pub kind: String,
}

impl EventArgs {
    pub fn run(self) -> Result<()> {
        let home = dirs::home_dir().context("could not determine home directory")?;

        match send_event(&home, &self.kind) {
            Ok(_) => {
                println!("event '{}' forwarded", self.kind);
                Ok(())
            }
            Err(DaemonError::DaemonNotRunning { .. }) => {
                println!("daemon is not running");
                Ok(())
            }
            Err(err) => Err(err).with_context(|| format!("failed to forward '{}'", self.kind)),
        }
    }
}

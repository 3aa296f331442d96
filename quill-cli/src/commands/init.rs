//! `quill init` — register an existing git working tree.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use quill_core::config;

/// Arguments for `quill init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path to the git working tree holding the document set. The repository
    /// (remote, credentials, upstream) must already be configured.
    pub path: PathBuf,

    /// Disable automatic syncing (blur loop, startup sync).
    #[arg(long)]
    pub no_auto_sync: bool,

    /// Refresh the indicator on host data-change events.
    #[arg(long)]
    pub check_on_data_change: bool,

    /// Commit and push when the host window is hidden.
    #[arg(long)]
    pub push_on_hide: bool,

    /// Minimum seconds between automatic syncs.
    #[arg(long)]
    pub interval: Option<u64>,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = dirs::home_dir().context("could not determine home directory")?;
        let repo = self
            .path
            .canonicalize()
            .with_context(|| format!("working tree not found at {}", self.path.display()))?;

        let mut settings = config::init_at(&home, repo).context("failed to write settings")?;

        let mut changed = false;
        if self.no_auto_sync && settings.auto_sync {
            settings.auto_sync = false;
            changed = true;
        }
        if self.check_on_data_change && !settings.check_on_data_change {
            settings.check_on_data_change = true;
            changed = true;
        }
        if self.push_on_hide && !settings.push_on_hide {
            settings.push_on_hide = true;
            changed = true;
        }
        if let Some(interval) = self.interval {
            if settings.sync_interval_secs != interval {
                settings.sync_interval_secs = interval;
                changed = true;
            }
        }
        if changed {
            settings.updated_at = Utc::now();
            config::save_at(&home, &settings).context("failed to update settings")?;
        }

        println!("✓ registered working tree: {}", settings.repo.display());
        println!(
            "  auto sync: {}  interval: {}s  data-change checks: {}  push on hide: {}",
            settings.auto_sync,
            settings.sync_interval_secs,
            settings.check_on_data_change,
            settings.push_on_hide,
        );
        Ok(())
    }
}

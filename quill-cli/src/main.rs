//! Quill — git-backed document-tree sync agent CLI.
//!
//! # Usage
//!
//! ```text
//! quill init <repo-path> [--no-auto-sync] [--check-on-data-change] [--push-on-hide] [--interval <secs>]
//! quill sync
//! quill status [--json]
//! quill event <focus|blur|route-change|data-change|hide>
//! quill daemon start|stop|status|logs
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    daemon::DaemonCommand, event::EventArgs, init::InitArgs, status::StatusArgs, sync::SyncArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "quill",
    version,
    about = "Keep a local document tree and its remote repository convergent",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register an existing git working tree for syncing.
    Init(InitArgs),

    /// Run one sync sequence now (manual trigger, bypasses the throttle).
    Sync(SyncArgs),

    /// Show local dirtiness and remote divergence.
    Status(StatusArgs),

    /// Forward a host event (focus, blur, route-change, data-change, hide).
    Event(EventArgs),

    /// Manage the background sync daemon.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Event(args) => args.run(),
        Commands::Daemon { command } => commands::daemon::run(command),
    }
}

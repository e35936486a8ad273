//! repotree: keep a `root/<group>/<repo>` checkout tree in sync with a
//! definition document.
//!
//! # Usage
//!
//! ```text
//! repotree init --org <org> --definition <path> [--tag <tag>]...
//! repotree sync [--ask-move] [--ask-clone] [--offline]
//! repotree status [--json]
//! ```
//!
//! Every command except `init` locates `.repotree.yaml` by walking upward from
//! the current directory.

mod commands;
mod github;
mod terminal;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{init::InitArgs, status::StatusArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "repotree",
    version,
    about = "Keep a tree of git checkouts in sync with an organization's repository definition",
    long_about = None,
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a `.repotree.yaml` manifest into the current directory.
    Init(InitArgs),

    /// Reconcile the checkout tree: move, clone, update and report.
    Sync(SyncArgs),

    /// Classify the checkout tree without running git or contacting the remote.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Status(args) => args.run(),
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the verbosity flag.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

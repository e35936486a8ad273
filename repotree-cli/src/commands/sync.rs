//! `repotree sync`: reconcile the checkout tree with the definition document.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use repotree_core::manifest;
use repotree_core::paths::audit_log_path;
use repotree_git::audit::{rotate_if_oversized, MAX_AUDIT_BYTES, MAX_ROTATED_AUDIT_FILES};
use repotree_git::{AuditSink, CloneHost, FileAuditLog};
use repotree_sync::driver::{self, SyncEnv};
use repotree_sync::{RemoteRepoLister, SyncOptions, SyncOutcome, SyncSummary};

use crate::github::GithubLister;
use crate::terminal::{StdinReader, TerminalReporter};

/// Arguments for `repotree sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Offer to move repositories found under a previous name.
    #[arg(long)]
    pub ask_move: bool,

    /// Offer to clone missing repositories.
    #[arg(long)]
    pub ask_clone: bool,

    /// Skip the remote repository listing.
    #[arg(long)]
    pub offline: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let cwd = std::env::current_dir().context("cannot determine current directory")?;
        let loaded = manifest::load_from(&cwd)
            .context("failed to load manifest; run `repotree init` first")?;

        let log_path = audit_log_path(&loaded.root);
        if rotate_if_oversized(&log_path, MAX_AUDIT_BYTES, MAX_ROTATED_AUDIT_FILES)
            .with_context(|| format!("failed to rotate '{}'", log_path.display()))?
        {
            tracing::info!(path = %log_path.display(), "rotated audit log");
        }
        let audit: Arc<dyn AuditSink> = Arc::new(
            FileAuditLog::open(&log_path)
                .with_context(|| format!("failed to open '{}'", log_path.display()))?,
        );

        let lister: Option<Arc<dyn RemoteRepoLister>> = if self.offline {
            None
        } else {
            Some(Arc::new(GithubLister::from_env()))
        };
        let options = SyncOptions {
            ask_move: self.ask_move,
            ask_clone: self.ask_clone,
        };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        let reporter = TerminalReporter;
        let env = SyncEnv {
            reporter: &reporter,
            lister,
            audit,
            clone_host: CloneHost::github(),
        };
        let mut reader = StdinReader::new().context("failed to start stdin reader")?;
        let outcome = runtime
            .block_on(driver::run(&loaded, options, &env, &mut reader))
            .with_context(|| format!("sync failed in '{}'", loaded.root.display()))?;

        match outcome {
            SyncOutcome::RerunRequired { moves } => {
                println!();
                println!(
                    "✓ Moved {} repositories. Run `repotree sync` again to finish.",
                    moves.len()
                );
            }
            SyncOutcome::Completed(summary) => print_summary(&summary),
        }
        Ok(())
    }
}

fn print_summary(summary: &SyncSummary) {
    println!();
    println!(
        "✓ {} updated, {} unchanged, {} dirty, {} unpushed, {} failed",
        summary.updated.len(),
        summary.unchanged,
        summary.dirty.len(),
        summary.unpushed.len(),
        summary.failed,
    );
    if !summary.missing.is_empty() && summary.cloned.is_empty() {
        println!(
            "  {} missing; run `repotree sync --ask-clone` to clone them",
            summary.missing.len()
        );
    }
    if !summary.moved.is_empty() {
        println!(
            "  {} under a previous name; run `repotree sync --ask-move` to move them",
            summary.moved.len()
        );
    }
}

//! `repotree init --org <org> --definition <path> [--tag <tag>]...`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use repotree_core::{manifest, Manifest};

/// Write a manifest for the current directory.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// GitHub organization whose repositories this tree holds.
    #[arg(long)]
    pub org: String,

    /// Path to the definition document, relative to the current directory.
    #[arg(long, value_name = "PATH")]
    pub definition: PathBuf,

    /// Only include projects carrying this tag. Repeatable.
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let cwd = std::env::current_dir().context("cannot determine current directory")?;
        if !cwd.join(&self.definition).is_file() {
            eprintln!(
                "warning: definition document '{}' does not exist yet",
                self.definition.display()
            );
        }

        let org = self.org.clone();
        let path = manifest::init_at(&cwd, &Manifest::new(self.org, self.definition, self.tags))
            .with_context(|| format!("failed to initialize '{}'", cwd.display()))?;

        println!("✓ Initialized repotree for '{org}'");
        println!("  Manifest: {}", path.display());
        Ok(())
    }
}

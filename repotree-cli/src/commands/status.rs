//! `repotree status`: classification of the checkout tree, without git or network.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use repotree_core::{definition, manifest, resolve_expected, ExpectedRepo, LoadedManifest, ResolveOptions};
use repotree_git::MemoryAuditLog;
use repotree_sync::{classify, Classification, GitContext};

/// Arguments for `repotree status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let cwd = std::env::current_dir().context("cannot determine current directory")?;
        let loaded = manifest::load_from(&cwd)
            .context("failed to load manifest; run `repotree init` first")?;

        let expected = resolve(&loaded)?;
        let ctx = GitContext::new(
            loaded.root.clone(),
            loaded.manifest.main_branch(),
            Arc::new(MemoryAuditLog::new()),
        );
        let classification = classify(&ctx, &expected)
            .with_context(|| format!("failed to scan '{}'", loaded.root.display()))?;

        let report = build_report(&classification, &expected);
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
        } else {
            print_table(&loaded, report);
        }
        Ok(())
    }
}

fn resolve(loaded: &LoadedManifest) -> Result<Vec<ExpectedRepo>> {
    let path = loaded.definition_path();
    let definition = definition::load_at(&path)
        .with_context(|| format!("failed to load definition '{}'", path.display()))?;
    let resolved = resolve_expected(
        &definition,
        &ResolveOptions {
            org: &loaded.manifest.github_organization,
            tags: loaded.manifest.tags(),
            root: &loaded.root,
            remote: None,
        },
    );
    Ok(resolved.repos)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum EntryState {
    Ok,
    Moved,
    Archived,
    Missing,
    Unknown,
}

impl EntryState {
    fn label(self) -> String {
        match self {
            Self::Ok => "ok".green().to_string(),
            Self::Moved => "moved".yellow().to_string(),
            Self::Archived => "archived".bright_black().to_string(),
            Self::Missing => "missing".red().to_string(),
            Self::Unknown => "unknown".magenta().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusEntry {
    /// Relpath on disk, or the canonical relpath for missing repositories.
    path: String,
    state: EntryState,
    /// Canonical `group/name`; absent for unknown directories.
    repository: Option<String>,
}

#[derive(Debug, Default, Serialize)]
struct StatusSummary {
    found: usize,
    moved: usize,
    archived: usize,
    missing: usize,
    unknown: usize,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    summary: StatusSummary,
    entries: Vec<StatusEntry>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "path")]
    path: String,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "repository")]
    repository: String,
}

fn build_report(classification: &Classification, expected: &[ExpectedRepo]) -> StatusReport {
    let mut entries = Vec::new();
    for found in &classification.found {
        let state = if found.is_moved() {
            EntryState::Moved
        } else if found.expected.archived {
            EntryState::Archived
        } else {
            EntryState::Ok
        };
        entries.push(StatusEntry {
            path: found.actual_relpath.clone(),
            state,
            repository: Some(found.id().to_string()),
        });
    }
    let missing = classification.missing(expected);
    for repo in &missing {
        entries.push(StatusEntry {
            path: repo.relpath(),
            state: EntryState::Missing,
            repository: Some(repo.id().to_string()),
        });
    }
    for relpath in &classification.unknown_dirs {
        entries.push(StatusEntry {
            path: relpath.clone(),
            state: EntryState::Unknown,
            repository: None,
        });
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));

    StatusReport {
        summary: StatusSummary {
            found: classification.found.len(),
            moved: classification.moved().count(),
            archived: classification.archived().count(),
            missing: missing.len(),
            unknown: classification.unknown_dirs.len(),
        },
        entries,
    }
}

fn print_table(loaded: &LoadedManifest, report: StatusReport) {
    let s = &report.summary;
    println!(
        "{} | {} found | {} moved | {} archived | {} missing | {} unknown",
        loaded.manifest.github_organization.bold(),
        s.found,
        s.moved,
        s.archived,
        s.missing,
        s.unknown,
    );
    if report.entries.is_empty() {
        println!("Nothing checked out and nothing expected.");
        return;
    }

    let rows: Vec<StatusTableRow> = report
        .entries
        .into_iter()
        .map(|entry| StatusTableRow {
            path: entry.path,
            state: entry.state.label(),
            repository: entry.repository.unwrap_or_default(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if s.moved > 0 || s.missing > 0 {
        println!("Run 'repotree sync --ask-move --ask-clone' to fix moved and missing repositories.");
    }
}

//! Directory classification: the two-level checkout tree against expected state.
//!
//! ```text
//! <root>/
//!   .hidden/            skipped
//!   stray-checkout/     contains .git → unknown, not descended into
//!   <group>/
//!     <name>/           candidate "group/name"
//! ```
//!
//! Each candidate is looked up in a single relpath index holding canonical and
//! alias relpaths. Canonical entries win when an alias collides with another
//! repository's canonical location.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use repotree_core::paths::{is_git_checkout, is_hidden};
use repotree_core::{ExpectedRepo, RepoId};
use repotree_git::{AuditSink, CloneHost, GitRepo};

use crate::error::{io_err, SyncError};

/// Everything needed to bind a [`GitRepo`] to a relpath.
#[derive(Clone)]
pub struct GitContext {
    pub root: PathBuf,
    pub main_branch: String,
    pub clone_host: CloneHost,
    pub audit: Arc<dyn AuditSink>,
}

impl GitContext {
    /// Clones come from github.com.
    pub fn new(root: PathBuf, main_branch: impl Into<String>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            root,
            main_branch: main_branch.into(),
            clone_host: CloneHost::github(),
            audit,
        }
    }

    pub fn bind(&self, relpath: &str) -> GitRepo {
        GitRepo::new(
            self.root.clone(),
            relpath,
            self.main_branch.clone(),
            self.audit.clone(),
        )
        .with_clone_host(self.clone_host.clone())
    }
}

/// An expected repository found on disk.
#[derive(Debug, Clone)]
pub struct ActualRepo {
    pub expected: ExpectedRepo,
    /// Where it was found; differs from the canonical relpath after a rename.
    pub actual_relpath: String,
    pub git: GitRepo,
}

impl ActualRepo {
    pub fn id(&self) -> RepoId {
        self.expected.id()
    }

    pub fn is_moved(&self) -> bool {
        self.actual_relpath != self.expected.relpath()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Sorted by actual relpath.
    pub found: Vec<ActualRepo>,
    /// Sorted relpaths that match no expected repository.
    pub unknown_dirs: Vec<String>,
}

impl Classification {
    pub fn moved(&self) -> impl Iterator<Item = &ActualRepo> {
        self.found.iter().filter(|r| r.is_moved())
    }

    /// Archived repositories that are still checked out.
    pub fn archived(&self) -> impl Iterator<Item = &ActualRepo> {
        self.found.iter().filter(|r| r.expected.archived)
    }

    /// Expected, not archived, and not found under any relpath.
    pub fn missing<'a>(&self, expected: &'a [ExpectedRepo]) -> Vec<&'a ExpectedRepo> {
        expected
            .iter()
            .filter(|repo| !repo.archived)
            .filter(|repo| {
                let id = repo.id();
                !self.found.iter().any(|found| found.id() == id)
            })
            .collect()
    }
}

/// Partition the tree under `ctx.root` into found and unknown directories.
pub fn classify(ctx: &GitContext, expected: &[ExpectedRepo]) -> Result<Classification, SyncError> {
    let index = relpath_index(expected);
    let mut classification = Classification::default();

    for group in sorted_dirs(&ctx.root)? {
        let group_path = ctx.root.join(&group);
        if is_git_checkout(&group_path) {
            classification.unknown_dirs.push(group);
            continue;
        }

        for name in sorted_dirs(&group_path)? {
            let relpath = format!("{group}/{name}");
            match index.get(relpath.as_str()) {
                Some(repo) => classification.found.push(ActualRepo {
                    expected: (*repo).clone(),
                    git: ctx.bind(&relpath),
                    actual_relpath: relpath,
                }),
                None => classification.unknown_dirs.push(relpath),
            }
        }
    }

    classification
        .found
        .sort_by(|a, b| a.actual_relpath.cmp(&b.actual_relpath));
    classification.unknown_dirs.sort();
    Ok(classification)
}

fn relpath_index(expected: &[ExpectedRepo]) -> HashMap<String, &ExpectedRepo> {
    let mut index: HashMap<String, &ExpectedRepo> =
        expected.iter().map(|repo| (repo.relpath(), repo)).collect();
    for repo in expected {
        for alias in repo.alias_relpaths() {
            index.entry(alias).or_insert(repo);
        }
    }
    index
}

/// Non-hidden subdirectory names of `dir`, sorted.
fn sorted_dirs(dir: &Path) -> Result<Vec<String>, SyncError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_hidden(&name) {
            continue;
        }
        let file_type = entry.file_type().map_err(|e| io_err(entry.path(), e))?;
        if file_type.is_dir() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

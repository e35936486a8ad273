//! On-disk layout of a managed root directory.
//!
//! ```text
//! <parent>/
//!   archive/                  (optional; archived checkouts are suggested to move here)
//!   <root>/
//!     .repotree.yaml          (manifest)
//!     .repotree.log           (audit log, newline-delimited JSON)
//!     <group>/<repo>/         (one checkout per expected repository)
//! ```

use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = ".repotree.yaml";
pub const AUDIT_LOG_FILE: &str = ".repotree.log";
pub const ARCHIVE_DIR: &str = "archive";
pub const GIT_DIR: &str = ".git";

pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(MANIFEST_FILE)
}

pub fn audit_log_path(root: &Path) -> PathBuf {
    root.join(AUDIT_LOG_FILE)
}

/// Sibling `archive` directory next to the root, if the root has a parent.
pub fn archive_dir(root: &Path) -> Option<PathBuf> {
    root.parent().map(|parent| parent.join(ARCHIVE_DIR))
}

/// Resolve a `group/name` relpath below `root`.
///
/// Relpaths always use `/` regardless of platform; each segment is joined
/// separately.
pub fn repo_dir(root: &Path, relpath: &str) -> PathBuf {
    relpath
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(root.to_path_buf(), |acc, segment| acc.join(segment))
}

/// Names starting with `.` are never groups or repositories.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

pub fn is_git_checkout(dir: &Path) -> bool {
    dir.join(GIT_DIR).exists()
}

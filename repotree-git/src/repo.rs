//! [`GitRepo`]: the adapter bound to one checkout below the root directory.
//!
//! Every command is reported to the audit sink with its full result before the
//! caller sees it. Errors are observed, never swallowed.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tokio::process::Command;

use crate::audit::{AuditRecord, AuditSink};
use crate::error::{io_err, GitError};
use crate::parse;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateRange {
    pub from: String,
    pub to: String,
}

/// Outcome of one [`GitRepo::update`] call.
///
/// A dirty checkout is never updated, so the two flags cannot both be set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateResult {
    /// Tracked changes or off the main branch; only remote refs were fetched.
    Dirty,
    /// Pulled, nothing new.
    Unchanged,
    Updated(UpdateRange),
}

impl UpdateResult {
    pub fn is_dirty(&self) -> bool {
        matches!(self, Self::Dirty)
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated(_))
    }

    pub fn range(&self) -> Option<&UpdateRange> {
        match self {
            Self::Updated(range) => Some(range),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub name: String,
    pub count: u32,
}

/// Transport used for `git clone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneProtocol {
    Https,
    Ssh,
}

impl CloneProtocol {
    /// URL on github.com.
    pub fn url(self, org: &str, name: &str) -> String {
        CloneHost::github().url(self, org, name)
    }
}

impl fmt::Display for CloneProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Https => write!(f, "https"),
            Self::Ssh => write!(f, "ssh"),
        }
    }
}

/// Where clones come from: `<prefix><org>/<name>.git` for each protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneHost {
    https_prefix: String,
    ssh_prefix: String,
}

impl Default for CloneHost {
    fn default() -> Self {
        Self::github()
    }
}

impl CloneHost {
    pub fn github() -> Self {
        Self {
            https_prefix: "https://github.com/".to_string(),
            ssh_prefix: "git@github.com:".to_string(),
        }
    }

    /// Serve both protocols from `<base>/<org>/<name>.git`; `base` may be a
    /// URL or a local directory of bare repositories.
    pub fn mirror(base: impl AsRef<str>) -> Self {
        let prefix = format!("{}/", base.as_ref().trim_end_matches('/'));
        Self {
            https_prefix: prefix.clone(),
            ssh_prefix: prefix,
        }
    }

    pub fn url(&self, protocol: CloneProtocol, org: &str, name: &str) -> String {
        let prefix = match protocol {
            CloneProtocol::Https => &self.https_prefix,
            CloneProtocol::Ssh => &self.ssh_prefix,
        };
        format!("{prefix}{org}/{name}.git")
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecPayload<'a> {
    command: &'static str,
    args: &'a [String],
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct GitRepo {
    root: PathBuf,
    relpath: String,
    main_branch: String,
    clone_host: CloneHost,
    audit: Arc<dyn AuditSink>,
}

impl fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitRepo")
            .field("root", &self.root)
            .field("relpath", &self.relpath)
            .field("main_branch", &self.main_branch)
            .field("clone_host", &self.clone_host)
            .finish_non_exhaustive()
    }
}

impl GitRepo {
    pub fn new(
        root: impl Into<PathBuf>,
        relpath: impl Into<String>,
        main_branch: impl Into<String>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            root: root.into(),
            relpath: relpath.into(),
            main_branch: main_branch.into(),
            clone_host: CloneHost::github(),
            audit,
        }
    }

    pub fn with_clone_host(mut self, clone_host: CloneHost) -> Self {
        self.clone_host = clone_host;
        self
    }

    /// `group/name` below the root; also the audit context.
    pub fn relpath(&self) -> &str {
        &self.relpath
    }

    pub fn path(&self) -> PathBuf {
        self.relpath
            .split('/')
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }

    pub fn main_branch(&self) -> &str {
        &self.main_branch
    }

    pub async fn current_branch(&self) -> Result<String, GitError> {
        let output = self.git(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        match String::from_utf8(output.stdout) {
            Ok(branch) => Ok(branch.trim().to_string()),
            Err(_) => {
                let err = GitError::NonTextOutput {
                    command: "git rev-parse --abbrev-ref HEAD".to_string(),
                };
                self.record_failure(&["rev-parse", "--abbrev-ref", "HEAD"], &err);
                Err(err)
            }
        }
    }

    /// Tracked-file modifications only; untracked files do not count.
    pub async fn has_changes_in_progress(&self) -> Result<bool, GitError> {
        let output = self
            .git(&["status", "--porcelain", "--untracked-files=no"])
            .await?;
        Ok(parse::has_tracked_changes(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }

    /// Whether the current branch is ahead of its upstream. No upstream → `false`.
    pub async fn has_unpushed_commits(&self) -> Result<bool, GitError> {
        let output = self
            .git(&["status", "--porcelain=v2", "--branch", "--untracked-files=no"])
            .await?;
        let status = String::from_utf8_lossy(&output.stdout);
        Ok(parse::ahead_of_upstream(&status).is_some_and(|ahead| ahead > 0))
    }

    /// Commit counts per author between two revisions, in git's order.
    pub async fn authors_for_range(&self, from: &str, to: &str) -> Result<Vec<Author>, GitError> {
        let range = format!("{from}..{to}");
        let output = self.git(&["shortlog", "-s", "-n", &range]).await?;
        Ok(parse::shortlog(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Clone `org/name` into this adapter's path, creating parent directories.
    pub async fn clone_from(
        &self,
        org: &str,
        name: &str,
        protocol: CloneProtocol,
    ) -> Result<(), GitError> {
        let target = self.path();
        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        if let Err(e) = tokio::fs::create_dir_all(&parent).await {
            let err = io_err(&parent, e);
            self.record_failure(&["clone"], &err);
            return Err(err);
        }

        let url = self.clone_host.url(protocol, org, name);
        let target_arg = target.to_string_lossy().into_owned();
        self.git_in(&parent, &["clone", &url, &target_arg]).await?;
        Ok(())
    }

    /// Bring the checkout up to date when that is safe.
    ///
    /// 1. tracked changes → fetch only, [`UpdateResult::Dirty`]
    /// 2. not on the main branch → fetch only, [`UpdateResult::Dirty`]
    /// 3. otherwise `git pull --rebase` and report the range it moved over
    pub async fn update(&self) -> Result<UpdateResult, GitError> {
        if self.has_changes_in_progress().await? {
            self.fetch().await?;
            return Ok(UpdateResult::Dirty);
        }

        let branch = self.current_branch().await?;
        if branch != self.main_branch {
            tracing::debug!(repo = %self.relpath, branch = %branch, "not on main branch");
            self.fetch().await?;
            return Ok(UpdateResult::Dirty);
        }

        let output = self.git(&["pull", "--rebase"]).await?;
        let text = format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        Ok(match parse::pull_range(&text) {
            Some(range) => UpdateResult::Updated(range),
            None => UpdateResult::Unchanged,
        })
    }

    async fn fetch(&self) -> Result<(), GitError> {
        self.git(&["fetch"]).await.map(|_| ())
    }

    // -----------------------------------------------------------------------
    // Command execution
    // -----------------------------------------------------------------------

    async fn git(&self, args: &[&str]) -> Result<Output, GitError> {
        let dir = self.path();
        self.git_in(&dir, args).await
    }

    async fn git_in(&self, dir: &Path, args: &[&str]) -> Result<Output, GitError> {
        let owned: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let command = format!("git {}", args.join(" "));

        let result = Command::new("git")
            .current_dir(dir)
            .args(args)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .output()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(source) => {
                let err = GitError::Spawn { command, source };
                self.record_failure(args, &err);
                return Err(err);
            }
        };

        let payload = ExecPayload {
            command: "git",
            args: &owned,
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        let value = serde_json::to_value(&payload).unwrap_or_else(|e| json!({ "error": e.to_string() }));
        self.audit
            .record(AuditRecord::exec_result(self.relpath.clone(), value));

        if !output.status.success() {
            tracing::debug!(repo = %self.relpath, command = %command, "git command failed");
            return Err(GitError::CommandFailed {
                command,
                code: output.status.code(),
                stderr: payload.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    fn record_failure(&self, args: &[&str], err: &GitError) {
        self.audit.record(AuditRecord::exec_result(
            self.relpath.clone(),
            json!({ "command": "git", "args": args, "error": err.to_string() }),
        ));
    }
}

//! Adapter tests against real local repositories: a bare "remote", a seed
//! checkout that pushes to it, and a managed clone under `<root>/team/svc`.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use repotree_git::{CloneHost, CloneProtocol, GitError, GitRepo, MemoryAuditLog, UpdateResult};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn git(dir: &Path, args: &[&str]) -> String {
    git_as(dir, "Test User", args)
}

fn git_as(dir: &Path, author: &str, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .env("LC_ALL", "C")
        .env("GIT_AUTHOR_NAME", author)
        .env("GIT_AUTHOR_EMAIL", "author@example.com")
        .env("GIT_COMMITTER_NAME", "Test User")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("utf8").trim().to_string()
}

fn commit_file(dir: &Path, author: &str, file: &str, contents: &str) {
    std::fs::write(dir.join(file), contents).expect("write file");
    git_as(dir, author, &["add", file]);
    git_as(dir, author, &["commit", "-q", "-m", &format!("update {file}")]);
}

struct Fixture {
    _tmp: TempDir,
    root: PathBuf,
    seed: PathBuf,
    audit: Arc<MemoryAuditLog>,
    repo: GitRepo,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().expect("tempdir");
        let remote = tmp.path().join("remote.git");
        let seed = tmp.path().join("seed");
        let root = tmp.path().join("root");
        std::fs::create_dir_all(&remote).unwrap();
        std::fs::create_dir_all(&seed).unwrap();
        std::fs::create_dir_all(root.join("team")).unwrap();

        git(&remote, &["init", "-q", "--bare", "--initial-branch=master"]);
        git(&seed, &["init", "-q", "--initial-branch=master"]);
        commit_file(&seed, "Test User", "README.md", "hello\n");
        git(&seed, &["remote", "add", "origin", remote.to_str().unwrap()]);
        git(&seed, &["push", "-q", "-u", "origin", "master"]);
        git(
            &root.join("team"),
            &["clone", "-q", remote.to_str().unwrap(), "svc"],
        );

        let audit = Arc::new(MemoryAuditLog::new());
        let repo = GitRepo::new(&root, "team/svc", "master", audit.clone());
        Self {
            _tmp: tmp,
            root,
            seed,
            audit,
            repo,
        }
    }

    fn checkout(&self) -> PathBuf {
        self.root.join("team").join("svc")
    }

    fn push_from_seed(&self, author: &str, file: &str) -> String {
        commit_file(&self.seed, author, file, &format!("{author}\n"));
        git(&self.seed, &["push", "-q"]);
        git(&self.seed, &["rev-parse", "HEAD"])
    }
}

// ---------------------------------------------------------------------------
// Update state machine
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clean_main_branch_pulls_and_reports_range() {
    let fx = Fixture::new();
    let before = git(&fx.checkout(), &["rev-parse", "HEAD"]);
    let after = fx.push_from_seed("Ada", "a.txt");

    let result = fx.repo.update().await.expect("update");
    let range = result.range().expect("updated").clone();
    assert!(!result.is_dirty());
    assert!(before.starts_with(&range.from), "{before} vs {}", range.from);
    assert!(after.starts_with(&range.to), "{after} vs {}", range.to);
    assert_eq!(git(&fx.checkout(), &["rev-parse", "HEAD"]), after);
}

#[tokio::test]
async fn up_to_date_checkout_is_unchanged() {
    let fx = Fixture::new();
    assert_eq!(fx.repo.update().await.expect("update"), UpdateResult::Unchanged);
}

#[tokio::test]
async fn tracked_changes_make_checkout_dirty_and_untouched() {
    let fx = Fixture::new();
    fx.push_from_seed("Ada", "a.txt");
    std::fs::write(fx.checkout().join("README.md"), "local edit\n").unwrap();
    let before = git(&fx.checkout(), &["rev-parse", "HEAD"]);

    assert_eq!(fx.repo.update().await.expect("update"), UpdateResult::Dirty);
    assert_eq!(git(&fx.checkout(), &["rev-parse", "HEAD"]), before);
    assert_eq!(
        std::fs::read_to_string(fx.checkout().join("README.md")).unwrap(),
        "local edit\n"
    );
}

#[tokio::test]
async fn untracked_files_do_not_block_update() {
    let fx = Fixture::new();
    std::fs::write(fx.checkout().join("scratch.txt"), "notes\n").unwrap();
    assert!(!fx.repo.has_changes_in_progress().await.expect("status"));
    assert_eq!(fx.repo.update().await.expect("update"), UpdateResult::Unchanged);
}

#[tokio::test]
async fn off_branch_checkout_is_dirty_even_when_clean() {
    let fx = Fixture::new();
    git(&fx.checkout(), &["checkout", "-q", "-b", "topic"]);
    fx.push_from_seed("Ada", "a.txt");

    assert_eq!(fx.repo.current_branch().await.expect("branch"), "topic");
    assert_eq!(fx.repo.update().await.expect("update"), UpdateResult::Dirty);
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn local_commit_is_reported_as_unpushed() {
    let fx = Fixture::new();
    assert!(!fx.repo.has_unpushed_commits().await.expect("status"));

    commit_file(&fx.checkout(), "Test User", "local.txt", "x\n");
    assert!(fx.repo.has_unpushed_commits().await.expect("status"));
}

#[tokio::test]
async fn branch_without_upstream_has_nothing_to_push() {
    let fx = Fixture::new();
    git(&fx.checkout(), &["checkout", "-q", "-b", "topic"]);
    commit_file(&fx.checkout(), "Test User", "local.txt", "x\n");
    assert!(!fx.repo.has_unpushed_commits().await.expect("status"));
}

#[tokio::test]
async fn authors_for_range_counts_commits() {
    let fx = Fixture::new();
    fx.push_from_seed("Ada", "a.txt");
    fx.push_from_seed("renovate[bot]", "b.txt");
    fx.push_from_seed("Ada", "c.txt");

    let result = fx.repo.update().await.expect("update");
    let range = result.range().expect("updated");
    let authors = fx
        .repo
        .authors_for_range(&range.from, &range.to)
        .await
        .expect("authors");

    let summary: Vec<(&str, u32)> = authors.iter().map(|a| (a.name.as_str(), a.count)).collect();
    assert_eq!(summary, vec![("Ada", 2), ("renovate[bot]", 1)]);
}

// ---------------------------------------------------------------------------
// Clone
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clone_from_mirror_creates_parent_directories() {
    let fx = Fixture::new();
    let mirror = fx.root.parent().unwrap().join("mirror");
    std::fs::create_dir_all(mirror.join("acme")).unwrap();
    let source = fx.root.parent().unwrap().join("remote.git");
    git(
        &mirror.join("acme"),
        &["clone", "-q", "--bare", source.to_str().unwrap(), "svc.git"],
    );

    let target = GitRepo::new(&fx.root, "fresh/svc", "master", fx.audit.clone())
        .with_clone_host(CloneHost::mirror(mirror.to_str().unwrap()));
    target
        .clone_from("acme", "svc", CloneProtocol::Https)
        .await
        .expect("clone");

    assert!(fx.root.join("fresh/svc/README.md").is_file());
    assert_eq!(target.current_branch().await.expect("branch"), "master");
    assert!(fx
        .audit
        .records()
        .iter()
        .any(|r| r.context == "fresh/svc" && r.payload["args"][0] == "clone"));
}

#[tokio::test]
async fn clone_of_unknown_repository_fails() {
    let fx = Fixture::new();
    let target = GitRepo::new(&fx.root, "fresh/nope", "master", fx.audit.clone())
        .with_clone_host(CloneHost::mirror(fx.root.parent().unwrap().to_str().unwrap()));

    let err = target
        .clone_from("acme", "nope", CloneProtocol::Ssh)
        .await
        .unwrap_err();
    assert!(matches!(err, GitError::CommandFailed { .. }), "got: {err}");
    assert!(!fx.root.join("fresh/nope").exists());
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_command_is_audited_with_repo_context() {
    let fx = Fixture::new();
    fx.repo.update().await.expect("update");

    let records = fx.audit.records();
    assert!(records.len() >= 3, "status, rev-parse, pull expected");
    for record in &records {
        assert_eq!(record.context, "team/svc");
        assert_eq!(record.kind, "exec-result");
    }
    let last = records.last().unwrap();
    assert_eq!(last.payload["args"][0], "pull");
    assert_eq!(last.payload["exitCode"], 0);
}

#[tokio::test]
async fn failures_are_audited_then_propagated() {
    let fx = Fixture::new();
    let missing = GitRepo::new(&fx.root, "team/missing", "master", fx.audit.clone());

    let err = missing.current_branch().await.unwrap_err();
    assert!(matches!(err, GitError::Spawn { .. }), "got: {err}");

    let bad_range = fx.repo.authors_for_range("deadbeef", "cafebabe").await;
    assert!(matches!(bad_range, Err(GitError::CommandFailed { .. })));

    let records = fx.audit.records();
    assert!(records
        .iter()
        .any(|r| r.context == "team/missing" && r.payload.get("error").is_some()));
    assert!(records
        .iter()
        .any(|r| r.context == "team/svc" && r.payload["exitCode"] != 0));
}

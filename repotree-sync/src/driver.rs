//! Reconciliation driver: one full sync run over the checkout tree.
//!
//! Order of a run:
//!
//! 1. fetch the remote listing (when a lister is configured) and resolve the
//!    expected repositories
//! 2. bootstrap pre-sync: if the definition document lives inside a found
//!    repository, update that repository alone, then reload and re-resolve
//! 3. classify the tree against the fresh expected state
//! 4. report unknown directories and archived checkouts
//! 5. moved repositories: report, optionally move, then stop
//! 6. missing repositories: report, optionally clone
//! 7. update pass, with authors for every updated repository
//! 8. dirty report, then unpushed report
//!
//! Nothing is deleted and nothing is moved or cloned without an answer from
//! the [`LineReader`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use repotree_core::definition;
use repotree_core::paths::{archive_dir, repo_dir};
use repotree_core::{resolve_expected, ExpectedRepo, LoadedManifest, RemoteRepo, RepoId, ResolveOptions};
use repotree_git::{AuditSink, CloneHost, CloneProtocol, UpdateResult};

use crate::classify::{classify, ActualRepo, Classification, GitContext};
use crate::error::{io_err, SyncError};
use crate::orchestrator::{for_each_bounded, update_repos, MAX_CONCURRENT_UPDATES};
use crate::prompt::{CloneAnswer, LineReader, MoveAnswer};
use crate::remote::RemoteRepoLister;
use crate::report::{Reporter, UpdatedRepo};

/// Hard limit for answering the move prompt.
pub const MOVE_PROMPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Which interactive actions the run may offer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub ask_move: bool,
    pub ask_clone: bool,
}

/// Collaborators of a run.
pub struct SyncEnv<'a> {
    pub reporter: &'a dyn Reporter,
    /// `None` skips the remote existence check.
    pub lister: Option<Arc<dyn RemoteRepoLister>>,
    pub audit: Arc<dyn AuditSink>,
    pub clone_host: CloneHost,
}

/// A repository found under an alias relpath.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedMove {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub unknown_dirs: Vec<String>,
    pub archived: Vec<RepoId>,
    pub moved: Vec<PlannedMove>,
    pub missing: Vec<RepoId>,
    pub cloned: Vec<RepoId>,
    pub updated: Vec<UpdatedRepo>,
    pub unchanged: usize,
    pub dirty: Vec<RepoId>,
    pub unpushed: Vec<RepoId>,
    /// Repositories whose update call failed.
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncSummary),
    /// Repositories were moved; the tree must be classified again.
    RerunRequired { moves: Vec<PlannedMove> },
}

/// Run one reconciliation of `loaded.root`.
pub async fn run<R: LineReader>(
    loaded: &LoadedManifest,
    options: SyncOptions,
    env: &SyncEnv<'_>,
    reader: &mut R,
) -> Result<SyncOutcome, SyncError> {
    let org = loaded.manifest.github_organization.as_str();
    let ctx = GitContext {
        clone_host: env.clone_host.clone(),
        ..GitContext::new(
            loaded.root.clone(),
            loaded.manifest.main_branch(),
            env.audit.clone(),
        )
    };

    let remote = match &env.lister {
        Some(lister) => Some(list_remote(lister.clone(), org).await?),
        None => None,
    };

    let expected = resolve(loaded, remote.as_deref(), env.reporter)?;
    let bootstrap = bootstrap_presync(loaded, &ctx, &expected, env.reporter).await?;
    let expected = match &bootstrap {
        Some(_) => resolve(loaded, remote.as_deref(), env.reporter)?,
        None => expected,
    };

    let classification = classify(&ctx, &expected)?;
    let mut summary = SyncSummary::default();

    report_unknown(&classification, env.reporter, &mut summary);
    report_archived(&loaded.root, &classification, env.reporter, &mut summary);

    let moves = plan_moves(&classification);
    if !moves.is_empty() {
        env.reporter.section("Moved repositories");
        for planned in &moves {
            env.reporter.info(&format!("{} -> {}", planned.from, planned.to));
        }
        if options.ask_move {
            let line = reader
                .read_line("Move these repositories now? [y/N]", Some(MOVE_PROMPT_TIMEOUT))
                .await?;
            if MoveAnswer::decode(&line) == MoveAnswer::Accept {
                apply_moves(&loaded.root, &moves).await?;
                env.reporter
                    .info("Repositories moved. Run sync again to continue.");
                return Ok(SyncOutcome::RerunRequired { moves });
            }
        }
        summary.moved = moves;
    }

    let missing = classification.missing(&expected);
    if !missing.is_empty() {
        env.reporter.section("Missing repositories");
        for repo in &missing {
            env.reporter.info(&repo.id().to_string());
        }
        summary.missing = missing.iter().map(|repo| repo.id()).collect();
        if options.ask_clone {
            let line = reader
                .read_line("Clone missing repositories? [h]ttps/[s]sh/[N]o", None)
                .await?;
            let protocol = match CloneAnswer::decode(&line) {
                CloneAnswer::Https => Some(CloneProtocol::Https),
                CloneAnswer::Ssh => Some(CloneProtocol::Ssh),
                CloneAnswer::Decline => None,
            };
            if let Some(protocol) = protocol {
                summary.cloned = clone_missing(&ctx, &missing, protocol, env.reporter).await?;
            }
        }
    }

    let to_update: Vec<ActualRepo> = classification
        .found
        .iter()
        .filter(|repo| bootstrap.as_deref() != Some(repo.actual_relpath.as_str()))
        .cloned()
        .collect();
    let attempted = to_update.len();
    let mut results = update_repos(to_update).await;
    summary.failed = attempted - results.len();
    if summary.failed > 0 {
        env.reporter.error(&format!(
            "{} of {attempted} repositories failed to update",
            summary.failed
        ));
    }
    results.sort_by(|a, b| a.repo.actual_relpath.cmp(&b.repo.actual_relpath));

    let mut announced = false;
    for entry in &results {
        match &entry.result {
            UpdateResult::Updated(range) => {
                let authors = match entry.repo.git.authors_for_range(&range.from, &range.to).await {
                    Ok(authors) => authors,
                    Err(err) => {
                        env.reporter.warn(&format!(
                            "could not list authors of {}: {err}",
                            entry.repo.id()
                        ));
                        Vec::new()
                    }
                };
                if !announced {
                    env.reporter.section("Updated repositories");
                    announced = true;
                }
                let updated = UpdatedRepo::new(
                    entry.repo.id(),
                    &entry.repo.expected.org,
                    &entry.repo.expected.name,
                    &range.from,
                    &range.to,
                    &authors,
                );
                env.reporter.updated(&updated);
                summary.updated.push(updated);
            }
            UpdateResult::Unchanged => summary.unchanged += 1,
            UpdateResult::Dirty => summary.dirty.push(entry.repo.id()),
        }
    }

    if !summary.dirty.is_empty() {
        env.reporter
            .section("Repositories with local changes or off the main branch");
        for entry in results.iter().filter(|entry| entry.result.is_dirty()) {
            env.reporter.info(&entry.repo.actual_relpath);
        }
    }

    summary.unpushed = check_unpushed(&classification, env.reporter).await;
    if !summary.unpushed.is_empty() {
        env.reporter.section("Repositories with unpushed commits");
        for id in &summary.unpushed {
            env.reporter.info(&id.to_string());
        }
    }

    tracing::info!(
        updated = summary.updated.len(),
        unchanged = summary.unchanged,
        dirty = summary.dirty.len(),
        failed = summary.failed,
        "sync finished"
    );
    Ok(SyncOutcome::Completed(summary))
}

async fn list_remote(
    lister: Arc<dyn RemoteRepoLister>,
    org: &str,
) -> Result<Vec<RemoteRepo>, SyncError> {
    let org = org.to_string();
    tokio::task::spawn_blocking(move || lister.list_repos(&org))
        .await
        .map_err(|e| SyncError::Join(e.to_string()))?
}

/// Load the definition document and resolve it against the manifest filters.
fn resolve(
    loaded: &LoadedManifest,
    remote: Option<&[RemoteRepo]>,
    reporter: &dyn Reporter,
) -> Result<Vec<ExpectedRepo>, SyncError> {
    let definition = definition::load_at(&loaded.definition_path())?;
    let resolved = resolve_expected(
        &definition,
        &ResolveOptions {
            org: &loaded.manifest.github_organization,
            tags: loaded.manifest.tags(),
            root: &loaded.root,
            remote,
        },
    );
    for id in &resolved.not_on_remote {
        reporter.warn(&format!(
            "{id} is not listed for {} on the remote, skipping",
            loaded.manifest.github_organization
        ));
    }
    Ok(resolved.repos)
}

/// Update the repository holding the definition document, if it is a found one.
///
/// Returns the relpath of that repository so the update pass can skip it.
async fn bootstrap_presync(
    loaded: &LoadedManifest,
    ctx: &GitContext,
    expected: &[ExpectedRepo],
    reporter: &dyn Reporter,
) -> Result<Option<String>, SyncError> {
    let definition_path = loaded.definition_path();
    let definition_path = definition_path
        .canonicalize()
        .map_err(|e| io_err(&definition_path, e))?;

    let classification = classify(ctx, expected)?;
    let Some(holder) = classification
        .found
        .iter()
        .find(|repo| contains(&repo.git.path(), &definition_path))
    else {
        return Ok(None);
    };

    tracing::info!(repo = %holder.actual_relpath, "updating definition repository first");
    match holder.git.update().await {
        Ok(UpdateResult::Updated(range)) => reporter.info(&format!(
            "Definition repository {} updated {}..{}",
            holder.id(),
            range.from,
            range.to
        )),
        Ok(UpdateResult::Unchanged) => {}
        Ok(UpdateResult::Dirty) => reporter.warn(&format!(
            "definition repository {} has local changes or is off the main branch, using it as is",
            holder.id()
        )),
        Err(err) => reporter.warn(&format!(
            "could not update definition repository {}: {err}",
            holder.id()
        )),
    }
    Ok(Some(holder.actual_relpath.clone()))
}

fn contains(dir: &Path, file: &Path) -> bool {
    dir.canonicalize()
        .map(|dir| file.starts_with(dir))
        .unwrap_or(false)
}

fn report_unknown(classification: &Classification, reporter: &dyn Reporter, summary: &mut SyncSummary) {
    if classification.unknown_dirs.is_empty() {
        return;
    }
    reporter.section("Unknown directories");
    for relpath in &classification.unknown_dirs {
        reporter.info(relpath);
    }
    summary.unknown_dirs = classification.unknown_dirs.clone();
}

fn report_archived(
    root: &Path,
    classification: &Classification,
    reporter: &dyn Reporter,
    summary: &mut SyncSummary,
) {
    let archived: Vec<&ActualRepo> = classification.archived().collect();
    if archived.is_empty() {
        return;
    }
    reporter.section("Archived repositories still checked out");
    let archive = archive_dir(root).filter(|dir| dir.is_dir());
    for repo in &archived {
        reporter.info(&repo.actual_relpath);
        if let Some(archive) = &archive {
            let group_dir = archive.join(&repo.expected.group);
            reporter.info(&format!(
                "  mkdir -p {} && mv {} {}",
                group_dir.display(),
                repo.git.path().display(),
                group_dir.join(&repo.expected.name).display()
            ));
        }
    }
    summary.archived = archived.iter().map(|repo| repo.id()).collect();
}

fn plan_moves(classification: &Classification) -> Vec<PlannedMove> {
    classification
        .moved()
        .map(|repo| PlannedMove {
            from: repo.actual_relpath.clone(),
            to: repo.expected.relpath(),
        })
        .collect()
}

/// Rename every planned move, after checking that no destination is taken.
async fn apply_moves(root: &Path, moves: &[PlannedMove]) -> Result<(), SyncError> {
    let mut claimed: HashSet<PathBuf> = HashSet::new();
    for planned in moves {
        let to = repo_dir(root, &planned.to);
        if to.exists() || !claimed.insert(to.clone()) {
            return Err(SyncError::MoveDestinationExists {
                from: planned.from.clone(),
                to,
            });
        }
    }

    for planned in moves {
        let from = repo_dir(root, &planned.from);
        let to = repo_dir(root, &planned.to);
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_err(parent, e))?;
        }
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| io_err(&from, e))?;
        tracing::info!(from = %planned.from, to = %planned.to, "moved repository");
    }
    Ok(())
}

/// Clone sequentially; the first failure aborts the remaining clones.
async fn clone_missing(
    ctx: &GitContext,
    missing: &[&ExpectedRepo],
    protocol: CloneProtocol,
    reporter: &dyn Reporter,
) -> Result<Vec<RepoId>, SyncError> {
    let mut cloned = Vec::with_capacity(missing.len());
    for repo in missing {
        reporter.info(&format!("Cloning {} over {protocol}", repo.id()));
        ctx.bind(&repo.relpath())
            .clone_from(&repo.org, &repo.name, protocol)
            .await?;
        cloned.push(repo.id());
    }
    Ok(cloned)
}

async fn check_unpushed(classification: &Classification, reporter: &dyn Reporter) -> Vec<RepoId> {
    let checks = for_each_bounded(
        classification.found.clone(),
        MAX_CONCURRENT_UPDATES,
        |repo| async move {
            let result = repo.git.has_unpushed_commits().await;
            (repo, result)
        },
    )
    .await;

    let mut unpushed = Vec::new();
    for (repo, result) in checks {
        match result {
            Ok(true) => unpushed.push(repo.id()),
            Ok(false) => {}
            Err(err) => reporter.warn(&format!(
                "could not check {} for unpushed commits: {err}",
                repo.id()
            )),
        }
    }
    unpushed.sort();
    unpushed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn moved(from: &str, to: &str) -> PlannedMove {
        PlannedMove {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    #[tokio::test]
    async fn moves_are_checked_before_any_rename() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("Old/r1")).unwrap();
        fs::create_dir_all(tmp.path().join("Old/r2")).unwrap();
        fs::create_dir_all(tmp.path().join("B/r2")).unwrap();

        let err = apply_moves(tmp.path(), &[moved("Old/r1", "A/r1"), moved("Old/r2", "B/r2")])
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::MoveDestinationExists { ref from, .. } if from == "Old/r2"));
        assert!(tmp.path().join("Old/r1").exists());
        assert!(!tmp.path().join("A").exists());
    }

    #[tokio::test]
    async fn two_moves_to_one_destination_collide() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("X/r1")).unwrap();
        fs::create_dir_all(tmp.path().join("Y/r1")).unwrap();

        let err = apply_moves(tmp.path(), &[moved("X/r1", "A/r1"), moved("Y/r1", "A/r1")])
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::MoveDestinationExists { .. }));
        assert!(tmp.path().join("X/r1").exists());
    }

    #[tokio::test]
    async fn accepted_moves_create_parent_and_rename() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("Old/r1/src")).unwrap();

        apply_moves(tmp.path(), &[moved("Old/r1", "A/r1")]).await.unwrap();
        assert!(tmp.path().join("A/r1/src").is_dir());
        assert!(!tmp.path().join("Old/r1").exists());
    }
}

//! Expected-state resolution: definition document → flat list of [`ExpectedRepo`].

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::definition::Definition;
use crate::paths::repo_dir;
use crate::types::{Alias, ExpectedRepo, RepoId};

/// A repository as listed by the hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepo {
    pub name: String,
    #[serde(default)]
    pub archived: bool,
}

/// Filters and context for [`resolve_expected`].
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions<'a> {
    pub org: &'a str,
    /// Project tag filter; `None` keeps every project.
    pub tags: Option<&'a [String]>,
    /// Root of the checkout tree, used to keep already-cloned repositories.
    pub root: &'a Path,
    /// Remote listing for `org`; `None` skips the existence check.
    pub remote: Option<&'a [RemoteRepo]>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    pub repos: Vec<ExpectedRepo>,
    /// Declared repositories the remote listing does not know about.
    pub not_on_remote: Vec<RepoId>,
}

/// Resolve the expected repositories of `opts.org`.
///
/// With a tag filter, a repository is kept if its project carries at least one
/// of the tags, or if `root/<project>/<name>` already exists. Changing the
/// filter therefore never makes existing checkouts look unexpected.
pub fn resolve_expected(definition: &Definition, opts: &ResolveOptions<'_>) -> Resolved {
    let remote: Option<HashMap<&str, &RemoteRepo>> = opts
        .remote
        .map(|list| list.iter().map(|r| (r.name.as_str(), r)).collect());

    let mut resolved = Resolved::default();
    for project in &definition.projects {
        let tagged = match opts.tags {
            None => true,
            Some(filter) => project.tags.iter().any(|tag| filter.contains(tag)),
        };

        for org in project.github.iter().filter(|o| o.organization == opts.org) {
            for repo in &org.repos {
                if !tagged && !repo_dir(opts.root, &format!("{}/{}", project.name, repo.name)).exists()
                {
                    continue;
                }

                let mut archived = repo.archived;
                if let Some(remote) = &remote {
                    match remote.get(repo.name.as_str()) {
                        Some(listed) => archived |= listed.archived,
                        None => {
                            let id = RepoId::new(&project.name, &repo.name);
                            tracing::debug!(repo = %id, org = opts.org, "repository not found on remote, skipping");
                            resolved.not_on_remote.push(id);
                            continue;
                        }
                    }
                }

                resolved.repos.push(ExpectedRepo {
                    org: org.organization.clone(),
                    group: project.name.clone(),
                    name: repo.name.clone(),
                    archived,
                    aliases: repo
                        .previous_names
                        .iter()
                        .map(|prev| Alias::new(prev.project.clone(), prev.name.clone()))
                        .collect(),
                });
            }
        }
    }
    resolved
}

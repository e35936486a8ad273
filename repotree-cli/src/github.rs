//! GitHub implementation of [`RemoteRepoLister`].

use std::time::Duration;

use serde::Deserialize;

use repotree_core::RemoteRepo;
use repotree_sync::{RemoteRepoLister, SyncError};

pub const GITHUB_API: &str = "https://api.github.com";

/// Largest page the API serves; a shorter page is the last one.
const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct GithubRepo {
    name: String,
    #[serde(default)]
    archived: bool,
}

pub struct GithubLister {
    base_url: String,
    token: Option<String>,
    agent: ureq::Agent,
}

impl GithubLister {
    /// Public API, authenticated with `GITHUB_TOKEN` when it is set.
    pub fn from_env() -> Self {
        let token = std::env::var("GITHUB_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());
        Self::new(GITHUB_API, token)
    }

    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("repotree/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            base_url: base_url.into(),
            token,
            agent,
        }
    }

    fn page_url(&self, org: &str, page: u32) -> String {
        format!(
            "{}/orgs/{org}/repos?per_page={PAGE_SIZE}&page={page}",
            self.base_url.trim_end_matches('/')
        )
    }
}

impl RemoteRepoLister for GithubLister {
    fn list_repos(&self, org: &str) -> Result<Vec<RemoteRepo>, SyncError> {
        let mut repos = Vec::new();
        let mut page = 1;
        loop {
            let mut request = self
                .agent
                .get(&self.page_url(org, page))
                .set("Accept", "application/vnd.github+json");
            if let Some(token) = &self.token {
                request = request.set("Authorization", &format!("Bearer {token}"));
            }

            let batch: Vec<GithubRepo> = request
                .call()
                .map_err(|e| SyncError::Remote(format!("listing {org} page {page}: {e}")))?
                .into_json()
                .map_err(|e| SyncError::Remote(format!("decoding {org} page {page}: {e}")))?;
            tracing::debug!(org, page, count = batch.len(), "fetched repository page");

            let last = batch.len() < PAGE_SIZE;
            repos.extend(batch.into_iter().map(|repo| RemoteRepo {
                name: repo.name,
                archived: repo.archived,
            }));
            if last {
                return Ok(repos);
            }
            page += 1;
        }
    }
}

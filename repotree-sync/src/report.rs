//! Report model for a sync run and the bot-author heuristic.
//!
//! The driver decides *what* is reported; a [`Reporter`] decides how it looks.

use serde::Serialize;

use repotree_core::RepoId;
use repotree_git::Author;

/// Case-insensitive substrings that mark an author as automation.
pub const BOT_MARKERS: &[&str] = &["renovate", "jenkins", "snyk-", "dependabot", "github-actions"];

/// Output channel for a sync run.
///
/// `info` lines are the report itself; `warn` and `error` go to a separate,
/// distinguishable channel.
pub trait Reporter: Send + Sync {
    fn section(&self, title: &str);
    fn info(&self, line: &str);
    fn warn(&self, line: &str);
    fn error(&self, line: &str);
    fn updated(&self, repo: &UpdatedRepo);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Styling {
    Robot,
    Human,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorLine {
    pub name: String,
    pub count: u32,
    pub bot: bool,
}

/// One updated repository with the authors that contributed to the update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatedRepo {
    pub id: RepoId,
    pub name: String,
    pub compare_url: String,
    pub styling: Styling,
    pub authors: Vec<AuthorLine>,
}

impl UpdatedRepo {
    /// Authors keep the order the adapter returned them in.
    pub fn new(id: RepoId, org: &str, name: &str, from: &str, to: &str, authors: &[Author]) -> Self {
        Self {
            id,
            name: name.to_string(),
            compare_url: compare_url(from, to, org, name),
            styling: styling_for(authors),
            authors: authors
                .iter()
                .map(|a| AuthorLine {
                    name: a.name.clone(),
                    count: a.count,
                    bot: is_bot(&a.name),
                })
                .collect(),
        }
    }
}

pub fn is_bot(author: &str) -> bool {
    let lower = author.to_lowercase();
    BOT_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Robot only when there is at least one author and all of them are bots.
pub fn styling_for(authors: &[Author]) -> Styling {
    if !authors.is_empty() && authors.iter().all(|a| is_bot(&a.name)) {
        Styling::Robot
    } else {
        Styling::Human
    }
}

pub fn compare_url(from: &str, to: &str, org: &str, name: &str) -> String {
    format!("https://github.com/{org}/{name}/compare/{from}...{to}")
}

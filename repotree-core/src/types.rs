//! Domain types for expected repositories.
//!
//! Identity is always `group/name`, where the group is the project the
//! repository belongs to in the definition document. Relpaths use `/` on every
//! platform; use [`crate::paths::repo_dir`] to turn one into a filesystem path.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A repository identity of the form `group/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoId(pub String);

impl RepoId {
    pub fn new(group: &str, name: &str) -> Self {
        Self(format!("{group}/{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RepoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RepoId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A `(group, name)` pair that previously identified a repository.
///
/// Only used to match directories on disk, never as display identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alias {
    pub group: String,
    pub name: String,
}

impl Alias {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    pub fn relpath(&self) -> String {
        format!("{}/{}", self.group, self.name)
    }
}

/// A repository the definition document says should be checked out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedRepo {
    /// Organization on the hosting service.
    pub org: String,
    /// Project the repository belongs to; also its top-level directory.
    pub group: String,
    pub name: String,
    pub archived: bool,
    /// Previous identities, in declaration order.
    #[serde(default)]
    pub aliases: Vec<Alias>,
}

impl ExpectedRepo {
    pub fn id(&self) -> RepoId {
        RepoId::new(&self.group, &self.name)
    }

    /// Canonical location below the root directory.
    pub fn relpath(&self) -> String {
        format!("{}/{}", self.group, self.name)
    }

    pub fn alias_relpaths(&self) -> impl Iterator<Item = String> + '_ {
        self.aliases.iter().map(Alias::relpath)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> ExpectedRepo {
        ExpectedRepo {
            org: "acme".to_string(),
            group: "platform".to_string(),
            name: "gateway".to_string(),
            archived: false,
            aliases: vec![Alias::new("legacy", "gateway"), Alias::new("platform", "edge")],
        }
    }

    #[test]
    fn id_and_relpath_agree() {
        let r = repo();
        assert_eq!(r.id().to_string(), "platform/gateway");
        assert_eq!(r.relpath(), r.id().0);
    }

    #[test]
    fn alias_relpaths_keep_declaration_order() {
        let relpaths: Vec<String> = repo().alias_relpaths().collect();
        assert_eq!(relpaths, vec!["legacy/gateway", "platform/edge"]);
    }

    #[test]
    fn newtype_equality() {
        assert_eq!(RepoId::from("a/b"), RepoId::new("a", "b"));
    }
}

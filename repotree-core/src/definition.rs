//! The desired-state definition document.
//!
//! Only the shape this tool reads is modelled; any other keys in the document
//! (teams, users, integrations) are ignored on load.
//!
//! ```yaml
//! projects:
//!   - name: platform
//!     tags: [core]
//!     github:
//!       - organization: acme
//!         repos:
//!           - name: gateway
//!             previousNames:
//!               - project: legacy
//!                 name: api-gateway
//!           - name: old-portal
//!             archived: true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousName {
    pub project: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoDefinition {
    pub name: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub previous_names: Vec<PreviousName>,
}

/// Repositories of one project inside one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgRepos {
    pub organization: String,
    #[serde(default)]
    pub repos: Vec<RepoDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDefinition {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub github: Vec<OrgRepos>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    #[serde(default)]
    pub projects: Vec<ProjectDefinition>,
}

/// Load the definition document at `path`.
///
/// Returns `CoreError::Io` if unreadable, `CoreError::Parse` (with path + line
/// context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<Definition, CoreError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| CoreError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

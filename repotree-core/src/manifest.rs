//! The `.repotree.yaml` manifest.
//!
//! ```yaml
//! version: 2
//! githubOrganization: acme
//! resourcesDefinition:
//!   path: ../resources/definition.yaml
//!   tags: [platform]
//! mainBranch: master
//! ```
//!
//! The directory holding the manifest is the root of the managed tree. The
//! manifest is located by walking upward from a start directory, the same way
//! git locates `.git`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};
use crate::paths::{manifest_path, MANIFEST_FILE};

/// Schema version this build understands.
pub const MANIFEST_VERSION: u32 = 2;

pub const DEFAULT_MAIN_BRANCH: &str = "master";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesDefinition {
    /// Path to the definition document, relative to the manifest directory.
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: u32,
    pub github_organization: String,
    pub resources_definition: ResourcesDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_branch: Option<String>,
}

impl Manifest {
    pub fn new(org: impl Into<String>, definition: PathBuf, tags: Vec<String>) -> Self {
        Self {
            version: MANIFEST_VERSION,
            github_organization: org.into(),
            resources_definition: ResourcesDefinition {
                path: definition,
                tags: if tags.is_empty() { None } else { Some(tags) },
            },
            main_branch: None,
        }
    }

    /// Tag filter; an empty list means no filtering.
    pub fn tags(&self) -> Option<&[String]> {
        self.resources_definition
            .tags
            .as_deref()
            .filter(|tags| !tags.is_empty())
    }

    pub fn main_branch(&self) -> &str {
        self.main_branch.as_deref().unwrap_or(DEFAULT_MAIN_BRANCH)
    }
}

/// A manifest together with the root directory it governs.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub root: PathBuf,
    pub manifest: Manifest,
}

impl LoadedManifest {
    /// Absolute location of the definition document.
    pub fn definition_path(&self) -> PathBuf {
        self.root.join(&self.manifest.resources_definition.path)
    }
}

/// Walk from `start` toward the filesystem root and return the first manifest found.
pub fn find_from(start: &Path) -> Result<PathBuf, CoreError> {
    start
        .ancestors()
        .map(manifest_path)
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| CoreError::ManifestNotFound {
            start: start.to_path_buf(),
        })
}

/// Load and version-check the manifest at `path`.
pub fn load_at(path: &Path) -> Result<LoadedManifest, CoreError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let manifest: Manifest = serde_yaml::from_str(&contents).map_err(|e| CoreError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    if manifest.version != MANIFEST_VERSION {
        return Err(CoreError::VersionMismatch {
            path: path.to_path_buf(),
            found: manifest.version,
            expected: MANIFEST_VERSION,
        });
    }
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(LoadedManifest { root, manifest })
}

/// `find_from` + `load_at`.
pub fn load_from(start: &Path) -> Result<LoadedManifest, CoreError> {
    load_at(&find_from(start)?)
}

/// Write a new manifest into `dir`.
///
/// Write flow: serialize → `.repotree.yaml.tmp` sibling → `rename`.
/// Returns [`CoreError::ManifestExists`] rather than replacing an existing file.
pub fn init_at(dir: &Path, manifest: &Manifest) -> Result<PathBuf, CoreError> {
    let path = manifest_path(dir);
    if path.exists() {
        return Err(CoreError::ManifestExists { path });
    }
    let yaml = serde_yaml::to_string(manifest)?;
    let tmp = dir.join(format!("{MANIFEST_FILE}.tmp"));
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    Ok(path)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
version: 2
githubOrganization: acme
resourcesDefinition:
  path: ../resources/definition.yaml
  tags:
    - platform
";

    #[test]
    fn parses_camel_case_fields() {
        let manifest: Manifest = serde_yaml::from_str(SAMPLE).expect("parse");
        assert_eq!(manifest.github_organization, "acme");
        assert_eq!(manifest.tags(), Some(&["platform".to_string()][..]));
        assert_eq!(manifest.main_branch(), DEFAULT_MAIN_BRANCH);
    }

    #[test]
    fn empty_tag_list_means_no_filter() {
        let manifest = Manifest::new("acme", PathBuf::from("def.yaml"), vec![]);
        assert_eq!(manifest.tags(), None);
    }

    #[test]
    fn definition_path_is_relative_to_root() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join(MANIFEST_FILE), SAMPLE).expect("write");
        let loaded = load_at(&dir.path().join(MANIFEST_FILE)).expect("load");
        assert_eq!(loaded.root, dir.path());
        assert_eq!(
            loaded.definition_path(),
            dir.path().join("../resources/definition.yaml")
        );
    }

    #[test]
    fn init_then_load_roundtrip() {
        let dir = TempDir::new().expect("tempdir");
        let manifest = Manifest::new("acme", PathBuf::from("def.yaml"), vec!["x".to_string()]);
        init_at(dir.path(), &manifest).expect("init");
        let loaded = load_from(dir.path()).expect("load");
        assert_eq!(loaded.manifest, manifest);
        assert!(!dir.path().join(format!("{MANIFEST_FILE}.tmp")).exists());
    }
}

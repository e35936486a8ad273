//! repotree core library: domain types, manifest, definition document, errors.
//!
//! Public API surface:
//! - [`types`]: expected-repository identity and aliases
//! - [`manifest`]: `.repotree.yaml` discovery, load, init
//! - [`definition`]: the desired-state document
//! - [`resolve`]: definition + filters → expected repositories
//! - [`paths`]: on-disk layout under the root directory
//! - [`error`]: [`CoreError`]

pub mod definition;
pub mod error;
pub mod manifest;
pub mod paths;
pub mod resolve;
pub mod types;

pub use error::CoreError;
pub use manifest::{LoadedManifest, Manifest, ResourcesDefinition, MANIFEST_VERSION};
pub use resolve::{resolve_expected, RemoteRepo, ResolveOptions, Resolved};
pub use types::{Alias, ExpectedRepo, RepoId};

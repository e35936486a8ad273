//! # repotree-sync
//!
//! Reconciles a checkout tree with the expected repositories of an
//! organization.
//!
//! Call [`driver::run`] for a full sync run, or [`classify::classify`] to
//! inspect the tree without touching any repository.

pub mod classify;
pub mod driver;
pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod remote;
pub mod report;

pub use classify::{classify, ActualRepo, Classification, GitContext};
pub use driver::{PlannedMove, SyncEnv, SyncOptions, SyncOutcome, SyncSummary};
pub use error::SyncError;
pub use orchestrator::{for_each_bounded, update_repos, RepoWithUpdateResult, MAX_CONCURRENT_UPDATES};
pub use prompt::{CloneAnswer, LineReader, MoveAnswer};
pub use remote::RemoteRepoLister;
pub use report::{Reporter, Styling, UpdatedRepo};

//! Boundary to the hosting service.

use repotree_core::RemoteRepo;

use crate::SyncError;

/// Lists the repositories an organization actually has on the hosting service.
///
/// Implementations may block; the driver calls them from a blocking task.
pub trait RemoteRepoLister: Send + Sync {
    fn list_repos(&self, org: &str) -> Result<Vec<RemoteRepo>, SyncError>;
}

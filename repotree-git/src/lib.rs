//! Git Repository Adapter: every version-control operation for one checkout,
//! observed by an append-only audit log.

pub mod audit;
mod error;
pub mod parse;
mod repo;

pub use audit::{AuditRecord, AuditSink, FileAuditLog, MemoryAuditLog};
pub use error::GitError;
pub use repo::{Author, CloneHost, CloneProtocol, GitRepo, UpdateRange, UpdateResult};

//! Shared types for repository layer.

mod pending_commit;

pub use pending_commit::PendingCommit;

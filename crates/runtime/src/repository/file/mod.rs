//! File-backed repository implementations.

mod pending_commit;

pub use pending_commit::FilePendingCommitRepository;

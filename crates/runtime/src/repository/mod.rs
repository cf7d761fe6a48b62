//! Repository layer for local runtime data.
//!
//! The ledger owns match state. The only thing the client must keep on its
//! own is the PendingCommit: the move behind a commitment that has been
//! accepted but not yet revealed. Losing it forfeits the round, so it is
//! written durably before any reveal is attempted.

mod error;
mod file;
mod memory;
mod traits;
mod types;

pub use error::{RepositoryError, Result};
pub use file::FilePendingCommitRepository;
pub use memory::InMemoryPendingCommitRepository;
pub use traits::PendingCommitRepository;
pub use types::PendingCommit;

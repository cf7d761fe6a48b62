//! Repository contract for the PendingCommit store.

use battle_core::Address;

use super::{PendingCommit, Result};

/// Durable store holding at most one PendingCommit per participant.
///
/// Implementations replace records atomically: a reader sees either the old
/// record or the new one, never a partial write.
pub trait PendingCommitRepository: Send + Sync {
    fn load(&self, participant: Address) -> Result<Option<PendingCommit>>;

    /// Replaces any existing record for `participant`.
    fn save(&self, participant: Address, pending: &PendingCommit) -> Result<()>;

    /// Removes the record; clearing an empty slot is not an error.
    fn clear(&self, participant: Address) -> Result<()>;
}

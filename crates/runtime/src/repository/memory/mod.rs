//! In-memory PendingCommitRepository for tests and simulations.

use std::collections::HashMap;
use std::sync::RwLock;

use battle_core::Address;

use crate::repository::{PendingCommit, PendingCommitRepository, RepositoryError, Result};

/// Volatile store; a "crash" is modelled by building a new instance.
#[derive(Default)]
pub struct InMemoryPendingCommitRepository {
    records: RwLock<HashMap<Address, PendingCommit>>,
}

impl InMemoryPendingCommitRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PendingCommitRepository for InMemoryPendingCommitRepository {
    fn load(&self, participant: Address) -> Result<Option<PendingCommit>> {
        let records = self
            .records
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(records.get(&participant).copied())
    }

    fn save(&self, participant: Address, pending: &PendingCommit) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        records.insert(participant, *pending);
        Ok(())
    }

    fn clear(&self, participant: Address) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        records.remove(&participant);
        Ok(())
    }
}

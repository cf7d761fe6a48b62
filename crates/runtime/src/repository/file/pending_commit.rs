//! File-based PendingCommitRepository implementation.

use std::fs;
use std::path::{Path, PathBuf};

use battle_core::Address;

use crate::repository::{PendingCommit, PendingCommitRepository, RepositoryError, Result};

/// Stores one JSON file per participant.
///
/// # File Format
///
/// `<participant>.pending.json`, where `<participant>` is the lowercase hex
/// address. Writes go to a `.tmp` sibling first and are renamed into place.
pub struct FilePendingCommitRepository {
    base_dir: PathBuf,
}

impl FilePendingCommitRepository {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).map_err(RepositoryError::Io)?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, participant: Address) -> PathBuf {
        self.base_dir
            .join(format!("{participant:x}.pending.json"))
    }
}

impl PendingCommitRepository for FilePendingCommitRepository {
    fn load(&self, participant: Address) -> Result<Option<PendingCommit>> {
        let path = self.path_for(participant);

        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path).map_err(RepositoryError::Io)?;
        let pending: PendingCommit = serde_json::from_slice(&bytes).map_err(|e| {
            RepositoryError::CorruptedData(format!("{}: {e}", path.display()))
        })?;

        tracing::debug!(
            target: "runtime::repository",
            match_id = %pending.match_id,
            round = pending.round,
            "Loaded pending commit from {}",
            path.display()
        );

        Ok(Some(pending))
    }

    fn save(&self, participant: Address, pending: &PendingCommit) -> Result<()> {
        let path = self.path_for(participant);
        let temp_path = path.with_extension("json.tmp");

        let bytes =
            serde_json::to_vec_pretty(pending).map_err(|e| RepositoryError::Json(e.to_string()))?;

        fs::write(&temp_path, bytes).map_err(RepositoryError::Io)?;
        fs::rename(&temp_path, &path).map_err(RepositoryError::Io)?;

        tracing::debug!(
            target: "runtime::repository",
            match_id = %pending.match_id,
            round = pending.round,
            "Saved pending commit to {}",
            path.display()
        );

        Ok(())
    }

    fn clear(&self, participant: Address) -> Result<()> {
        let path = self.path_for(participant);

        if path.exists() {
            fs::remove_file(&path).map_err(RepositoryError::Io)?;
            tracing::debug!(target: "runtime::repository", "Cleared {}", path.display());
        }

        Ok(())
    }
}

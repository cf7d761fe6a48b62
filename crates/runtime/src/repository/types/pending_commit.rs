use battle_core::{B256, COMMIT_SECRET, MatchId, MoveRef, commitment};
use serde::{Deserialize, Serialize};

/// Move behind an accepted commitment, kept until it has been revealed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCommit {
    pub match_id: MatchId,
    pub mv: MoveRef,
    pub round: u64,
}

impl PendingCommit {
    pub fn new(match_id: MatchId, mv: MoveRef, round: u64) -> Self {
        Self {
            match_id,
            mv,
            round,
        }
    }

    /// Commitment this record opens.
    pub fn commitment(&self) -> B256 {
        commitment(self.mv, &COMMIT_SECRET)
    }

    pub fn is_for(&self, match_id: MatchId, round: u64) -> bool {
        self.match_id == match_id && self.round == round
    }
}

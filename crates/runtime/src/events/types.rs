//! Event payloads published by the turn synchronizer.

use battle_core::{MatchId, MoveRef};
use serde::{Deserialize, Serialize};

use crate::sync::SyncState;

/// Turn-level progress of the local participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnEvent {
    /// The move provider was asked for a move.
    MoveRequested { match_id: MatchId, round: u64 },

    /// A commitment for `mv` was accepted by the ledger.
    MoveCommitted {
        match_id: MatchId,
        round: u64,
        mv: MoveRef,
        /// False when the PendingCommit could not be written to disk.
        persisted: bool,
    },

    /// The move was disclosed (revealed, or played openly in reveal-only mode).
    MoveRevealed {
        match_id: MatchId,
        round: u64,
        mv: MoveRef,
    },

    /// Derived synchronizer state changed.
    StateChanged { match_id: MatchId, state: SyncState },
}

/// Why the synchronizer leaves a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    GameOver,
    /// A participant escaped the match.
    Forfeited,
    /// The action deadline plus the abandon margin elapsed.
    Abandoned,
    /// A reveal was due but the local PendingCommit was missing or mismatched.
    LostCommit,
    /// The ledger rejected an action in a way that ends the match for us.
    Rejected,
    /// The participant holds no seat (already withdrawn or never seated).
    NotSeated,
}

impl ExitReason {
    pub fn describe(self) -> &'static str {
        match self {
            ExitReason::GameOver => "game over",
            ExitReason::Forfeited => "match forfeited",
            ExitReason::Abandoned => "match abandoned",
            ExitReason::LostCommit => "pending commit lost",
            ExitReason::Rejected => "action rejected by the ledger",
            ExitReason::NotSeated => "not seated in the match",
        }
    }
}

/// Match lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    ExitStarted {
        match_id: MatchId,
        reason: ExitReason,
    },

    /// Terminal: the synchronizer is done with this match.
    Exited {
        match_id: MatchId,
        reason: ExitReason,
    },

    /// Withdraw failed after retries; the next trigger tries again.
    ExitFailed {
        match_id: MatchId,
        reason: ExitReason,
        error: String,
    },

    /// Terminal: the synchronizer stopped acting without exiting the match.
    Halted { match_id: MatchId, reason: String },
}

impl LifecycleEvent {
    pub fn match_id(&self) -> MatchId {
        match self {
            LifecycleEvent::ExitStarted { match_id, .. }
            | LifecycleEvent::Exited { match_id, .. }
            | LifecycleEvent::ExitFailed { match_id, .. }
            | LifecycleEvent::Halted { match_id, .. } => *match_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleEvent::Exited { .. } | LifecycleEvent::Halted { .. }
        )
    }
}

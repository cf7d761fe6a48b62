//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from the ledger gateway, the PendingCommit store, move
//! providers and actor plumbing, and classifies each into a [`Disposition`]
//! that drives retry and exit decisions.
use battle_core::MatchId;
use client_ledger_core::{LedgerError, RejectionClass};
use thiserror::Error;
use tokio::sync::oneshot;

pub use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Reveal is due but no matching PendingCommit exists locally.
    #[error("no pending commit for {match_id} round {round}")]
    LostCommit { match_id: MatchId, round: u64 },

    /// The action does not fit the current phase yet.
    #[error("{action} not possible yet for {match_id}")]
    NotYet {
        match_id: MatchId,
        action: &'static str,
    },

    #[error("participant holds no seat in {0}")]
    NotSeated(MatchId),

    #[error("no move available: {0}")]
    NoMoveAvailable(String),

    #[error("move provider closed")]
    ProviderClosed,

    #[error("synchronizer command channel closed")]
    CommandChannelClosed,

    #[error("synchronizer reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("synchronizer task join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),
}

/// What the caller should do after an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Transient; the same action may succeed later.
    Retry,
    /// Too early for this phase; try again on a later trigger.
    NotYet,
    /// Give up on the match (or on the strategy step).
    Terminal,
}

impl RuntimeError {
    /// Classifies the error.
    ///
    /// `deadline_passed` tells whether the match's action deadline has
    /// elapsed locally; phase mismatches become terminal once it has.
    pub fn disposition(&self, deadline_passed: bool) -> Disposition {
        match self {
            RuntimeError::Ledger(err) if err.is_transient() => Disposition::Retry,
            RuntimeError::Ledger(err) => match err.rejection_class() {
                Some(RejectionClass::PhaseMismatch) if !deadline_passed => Disposition::NotYet,
                _ => Disposition::Terminal,
            },
            RuntimeError::Repository(_) => Disposition::Retry,
            RuntimeError::NotYet { .. } if !deadline_passed => Disposition::NotYet,
            RuntimeError::NotYet { .. } => Disposition::Terminal,
            RuntimeError::LostCommit { .. }
            | RuntimeError::NotSeated(_)
            | RuntimeError::NoMoveAvailable(_)
            | RuntimeError::ProviderClosed
            | RuntimeError::CommandChannelClosed
            | RuntimeError::ReplyChannelClosed(_)
            | RuntimeError::WorkerJoin(_) => Disposition::Terminal,
        }
    }

    /// Ledger reports that the match is over for this participant.
    pub fn is_terminal_for_match(&self) -> bool {
        matches!(
            self,
            RuntimeError::Ledger(err)
                if err.rejection_class() == Some(RejectionClass::TerminalForMatch)
        ) || matches!(self, RuntimeError::LostCommit { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_ledger_core::TransportError;

    #[test]
    fn transport_faults_retry() {
        let err: RuntimeError = LedgerError::from(TransportError::Timeout(10)).into();
        assert_eq!(err.disposition(false), Disposition::Retry);
        assert_eq!(err.disposition(true), Disposition::Retry);
    }

    #[test]
    fn phase_mismatch_depends_on_deadline() {
        let err: RuntimeError = LedgerError::rejected("MatchMakerV2: not in reveal phase").into();
        assert_eq!(err.disposition(false), Disposition::NotYet);
        assert_eq!(err.disposition(true), Disposition::Terminal);
    }

    #[test]
    fn terminal_rejections_and_unknown_text_are_terminal() {
        for message in [
            "MatchMakerV2: game over",
            "MatchMakerV2: not your match",
            "MMV3: Not challenged",
            "something nobody anticipated",
        ] {
            let err: RuntimeError = LedgerError::rejected(message).into();
            assert_eq!(err.disposition(false), Disposition::Terminal, "{message}");
        }
    }

    #[test]
    fn lost_commit_is_terminal_for_match() {
        let err = RuntimeError::LostCommit {
            match_id: MatchId(1),
            round: 0,
        };
        assert_eq!(err.disposition(false), Disposition::Terminal);
        assert!(err.is_terminal_for_match());
    }
}

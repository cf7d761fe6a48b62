//! Structured rejection reasons.
//!
//! Deployed ledgers report logic rejections as free-text revert strings such
//! as `"MatchMakerV2: not in reveal phase"`. Gateways convert that text into a
//! [`RejectionReason`] exactly once, here, so nothing above the gateway
//! boundary matches on strings.
use serde::{Deserialize, Serialize};

/// Why the ledger refused a call.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionReason {
    /// The match has ended.
    GameOver,
    /// The caller does not hold a seat in the match.
    NotYourMatch,
    /// A participant forfeited the match.
    MatchForfeited,
    /// Reveal submitted outside the reveal phase.
    NotInRevealPhase,
    /// Commit window for the round has closed.
    CommitClosed,
    /// Revealed move does not match the stored commitment.
    InvalidReveal,
    /// Queue join attempted in a challenge-only mode.
    ChallengeOnlyMode,
    /// Accept or reject of a challenge the caller is not party to.
    NotChallenged,
    /// A pending challenge to the same opponent already exists.
    AlreadyChallenged,
    /// The game mode no longer accepts matches.
    ModeClosed,
    /// The game mode has not opened yet.
    ModeNotStarted,
    /// Revert text this client does not recognise.
    Other(String),
}

/// Coarse grouping used for retry and exit decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectionClass {
    /// The match can no longer be played by this participant.
    TerminalForMatch,
    /// The call was early or late for the current phase.
    PhaseMismatch,
    /// The request itself was invalid; retrying cannot help.
    CallerError,
}

impl RejectionReason {
    /// Maps a revert message onto a reason.
    ///
    /// Matching is case-insensitive and ignores the contract prefix
    /// (`"MatchMakerV2: "`, `"MMV3: "`).
    pub fn classify(message: &str) -> Self {
        let text = message.to_ascii_lowercase();
        let has = |needle: &str| text.contains(needle);

        if has("game over") {
            RejectionReason::GameOver
        } else if has("not your match") {
            RejectionReason::NotYourMatch
        } else if has("forfeit") || has("escaped") {
            RejectionReason::MatchForfeited
        } else if has("not in reveal phase") {
            RejectionReason::NotInRevealPhase
        } else if has("can no longer commit") || has("already committed") {
            RejectionReason::CommitClosed
        } else if has("invalid reveal") || has("commit mismatch") {
            RejectionReason::InvalidReveal
        } else if has("supports challenge only") {
            RejectionReason::ChallengeOnlyMode
        } else if has("not challenged") {
            RejectionReason::NotChallenged
        } else if has("already challenged") {
            RejectionReason::AlreadyChallenged
        } else if has("can no longer be played") {
            RejectionReason::ModeClosed
        } else if has("has not jet started") || has("has not yet started") {
            RejectionReason::ModeNotStarted
        } else {
            RejectionReason::Other(message.trim().to_string())
        }
    }

    pub fn class(&self) -> RejectionClass {
        match self {
            RejectionReason::GameOver
            | RejectionReason::NotYourMatch
            | RejectionReason::MatchForfeited => RejectionClass::TerminalForMatch,
            RejectionReason::NotInRevealPhase | RejectionReason::CommitClosed => {
                RejectionClass::PhaseMismatch
            }
            RejectionReason::InvalidReveal
            | RejectionReason::ChallengeOnlyMode
            | RejectionReason::NotChallenged
            | RejectionReason::AlreadyChallenged
            | RejectionReason::ModeClosed
            | RejectionReason::ModeNotStarted
            | RejectionReason::Other(_) => RejectionClass::CallerError,
        }
    }
}

/// A logic rejection with the ledger's original text.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("ledger rejected call ({reason:?}): {message}")]
pub struct Rejection {
    pub reason: RejectionReason,
    pub message: String,
}

impl Rejection {
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            reason: RejectionReason::classify(&message),
            message,
        }
    }

    pub fn class(&self) -> RejectionClass {
        self.reason.class()
    }
}

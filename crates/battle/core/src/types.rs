//! Match model mirrored from the ledger.
//!
//! The ledger owns every value in this module. Clients hold read-only,
//! possibly stale copies that are replaced wholesale on each refresh.
use std::fmt;

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// Ledger-assigned match identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchId(pub u64);

impl MatchId {
    /// The ledger returns id 0 when a participant has no match.
    pub const NONE: Self = Self(0);

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "match#{}", self.0)
    }
}

/// Game mode identifier configured on the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameMode(pub u64);

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mode#{}", self.0)
    }
}

/// How a game mode lets participants find each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum ChallengeMode {
    /// Shared first-come queue only.
    #[default]
    Queue,
    /// Direct challenges only; joining the queue is rejected.
    OnlyChallenge,
    /// Both paths are open for the same mode.
    QueueAndChallenge,
}

impl ChallengeMode {
    pub fn allows_queue(self) -> bool {
        !matches!(self, ChallengeMode::OnlyChallenge)
    }

    pub fn allows_challenge(self) -> bool {
        !matches!(self, ChallengeMode::Queue)
    }
}

/// Seat of a participant inside a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    Challenger,
    Opponent,
}

impl Seat {
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Seat::Challenger => 0,
            Seat::Opponent => 1,
        }
    }

    #[inline]
    pub const fn other(self) -> Self {
        match self {
            Seat::Challenger => Seat::Opponent,
            Seat::Opponent => Seat::Challenger,
        }
    }
}

/// The two units a participant brings into a match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub units: [u64; 2],
}

impl Team {
    pub const fn new(first: u64, second: u64) -> Self {
        Self {
            units: [first, second],
        }
    }
}

/// One side of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub identity: Address,
    pub team: Team,
}

impl Participant {
    pub fn new(identity: Address, team: Team) -> Self {
        Self { identity, team }
    }

    /// An empty seat is reported as the zero address.
    pub fn is_empty(&self) -> bool {
        self.identity == Address::ZERO
    }
}

impl Default for Participant {
    fn default() -> Self {
        Self::new(Address::ZERO, Team::default())
    }
}

/// Reference to a move, i.e. the address of the move contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveRef(pub Address);

impl MoveRef {
    #[inline]
    pub const fn address(&self) -> Address {
        self.0
    }
}

impl From<Address> for MoveRef {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl fmt::Display for MoveRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Phase of the current round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::AsRefStr)]
pub enum Phase {
    Commit = 0,
    Reveal = 1,
    GameOver = 2,
}

impl Phase {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Phase::Commit),
            1 => Some(Phase::Reveal),
            2 => Some(Phase::GameOver),
            _ => None,
        }
    }
}

/// Per-seat move slot for the current round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMove {
    /// Commitment hash; zero while nothing has been committed.
    pub commit: B256,
    /// Revealed move, once disclosed.
    pub revealed: Option<MoveRef>,
}

impl PendingMove {
    pub const EMPTY: Self = Self {
        commit: B256::ZERO,
        revealed: None,
    };

    #[inline]
    pub fn is_committed(&self) -> bool {
        self.commit != B256::ZERO
    }

    #[inline]
    pub fn is_revealed(&self) -> bool {
        self.revealed.is_some()
    }
}

impl Default for PendingMove {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Authoritative match record as last read from the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub participants: [Participant; 2],
    pub phase: Phase,
    pub round: u64,
    pub pending_moves: [PendingMove; 2],
    /// Unix seconds after which the match can be forfeited.
    pub timeout_at: Option<u64>,
    /// Participant that escaped (forfeited) the match.
    pub escaped: Option<Address>,
}

impl Match {
    /// Fresh match at round 0 in commit phase.
    pub fn new(id: MatchId, challenger: Participant, opponent: Participant) -> Self {
        Self {
            id,
            participants: [challenger, opponent],
            phase: Phase::Commit,
            round: 0,
            pending_moves: [PendingMove::EMPTY; 2],
            timeout_at: None,
            escaped: None,
        }
    }

    pub fn seat_of(&self, identity: Address) -> Option<Seat> {
        if identity == Address::ZERO {
            return None;
        }
        if self.participants[0].identity == identity {
            Some(Seat::Challenger)
        } else if self.participants[1].identity == identity {
            Some(Seat::Opponent)
        } else {
            None
        }
    }

    #[inline]
    pub fn participant(&self, seat: Seat) -> &Participant {
        &self.participants[seat.index()]
    }

    #[inline]
    pub fn pending_move(&self, seat: Seat) -> &PendingMove {
        &self.pending_moves[seat.index()]
    }

    /// True while the opponent seat is still unoccupied.
    pub fn awaiting_opponent(&self) -> bool {
        self.participants.iter().any(Participant::is_empty)
    }

    pub fn is_forfeited(&self) -> bool {
        self.escaped.is_some()
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    /// True once `timeout_at + margin_secs` lies in the past.
    pub fn is_abandoned(&self, now_secs: u64, margin_secs: u64) -> bool {
        self.timeout_at
            .is_some_and(|timeout| timeout.saturating_add(margin_secs) < now_secs)
    }

    /// True once the action deadline for the current phase has passed.
    pub fn deadline_passed(&self, now_secs: u64) -> bool {
        self.timeout_at.is_some_and(|timeout| timeout < now_secs)
    }

    /// Ordering key used to reject snapshots that move backwards.
    pub fn progress(&self) -> (u64, Phase) {
        (self.round, self.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Match {
        Match::new(
            MatchId(7),
            Participant::new(Address::repeat_byte(0x11), Team::new(1, 3)),
            Participant::new(Address::repeat_byte(0x22), Team::new(4, 5)),
        )
    }

    #[test]
    fn seat_lookup_matches_identity() {
        let m = sample();
        assert_eq!(m.seat_of(Address::repeat_byte(0x11)), Some(Seat::Challenger));
        assert_eq!(m.seat_of(Address::repeat_byte(0x22)), Some(Seat::Opponent));
        assert_eq!(m.seat_of(Address::repeat_byte(0x33)), None);
        assert_eq!(m.seat_of(Address::ZERO), None, "zero address never owns a seat");
    }

    #[test]
    fn abandonment_requires_margin() {
        let mut m = sample();
        assert!(!m.is_abandoned(u64::MAX, 600), "no timeout means never abandoned");

        m.timeout_at = Some(1_000);
        assert!(m.deadline_passed(1_001));
        assert!(!m.is_abandoned(1_500, 600));
        assert!(m.is_abandoned(1_601, 600));
    }

    #[test]
    fn progress_orders_round_before_phase() {
        let mut a = sample();
        let mut b = sample();
        a.phase = Phase::Reveal;
        b.round = 1;
        assert!(a.progress() < b.progress());
    }

    #[test]
    fn phase_from_u8_rejects_unknown_values() {
        assert_eq!(Phase::from_u8(1), Some(Phase::Reveal));
        assert_eq!(Phase::from_u8(3), None);
    }
}

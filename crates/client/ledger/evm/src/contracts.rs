//! Solidity interfaces of the deployed match engine and event logger.

// The sol! macro generates code that we can't document, so allow missing_docs
#![allow(missing_docs)]

use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;
use battle_core::{Match, MatchId, MoveRef, Participant, PendingMove, Phase, Team};
use client_ledger_core::{Challenge, ChallengeStatus, LedgerError, RawLogRecord};

sol! {
    #[derive(Debug, PartialEq)]
    struct TeamView {
        address owner;
        uint256 firstMonster;
        uint256 secondMonster;
    }

    #[derive(Debug, PartialEq)]
    struct MoveCommit {
        bytes32 commit;
        address moveAddress;
    }

    #[derive(Debug, PartialEq)]
    struct MatchData {
        TeamView challengerTeam;
        TeamView opponentTeam;
        MoveCommit currentChallengerMove;
        MoveCommit currentOpponentMove;
        address escaped;
        uint256 timeout;
        uint256 round;
        uint8 phase;
    }

    #[derive(Debug, PartialEq)]
    struct MatchView {
        uint256 id;
        MatchData data;
    }

    #[derive(Debug, PartialEq)]
    struct LogEntry {
        uint256 id;
        uint256 action;
        uint256 timestamp;
        bytes data;
    }

    #[derive(Debug, PartialEq)]
    struct ChallengeView {
        uint256 id;
        address challenger;
        address opponent;
        uint8 status;
    }

    #[derive(Debug)]
    interface IMatchMaker {
        function getMatchByUser(address user) external view returns (MatchView memory);
        function getMatchById(uint256 matchId) external view returns (MatchView memory);
        function queuedTeams(uint256 mode) external view returns (address owner, uint256 firstMonster, uint256 secondMonster);

        function createAndJoin(uint256 mode, uint256 firstMonster, uint256 secondMonster) external;
        function withdraw(uint256 mode) external;
        function withdrawFromMatch(uint256 matchId) external;

        function commit(uint256 matchId, bytes32 moveCommit) external;
        function reveal(uint256 matchId, address moveAddress, bytes32 secret) external;

        function challengeOponent(uint256 mode, uint256 firstMonster, uint256 secondMonster, address opponent) external;
        function acceptChallenge(uint256 challengeId, uint256 firstMonster, uint256 secondMonster) external;
        function rejectChallenge(uint256 challengeId) external;
        function getChallengeListByUser(address user, uint256 mode) external view returns (ChallengeView[] memory);
    }

    #[derive(Debug)]
    interface IEventLogger {
        function getLogs(uint256 matchId, uint256 offset) external view returns (LogEntry[] memory);
    }
}

// Separate block: sol! treats same-named functions within one block as overloads.
sol! {
    /// Reveal-only match engine: moves are disclosed without a prior commit.
    #[derive(Debug)]
    interface IConfidentialMatchMaker {
        function reveal(uint256 matchId, address moveAddress) external;
    }
}

/// Narrows a ledger word to `u64`.
pub(crate) fn to_u64(value: U256, field: &str) -> Result<u64, LedgerError> {
    let limbs = value.as_limbs();
    if limbs[1..].iter().any(|limb| *limb != 0) {
        return Err(LedgerError::InvalidData(format!(
            "{field} does not fit in 64 bits: {value}"
        )));
    }
    Ok(limbs[0])
}

fn non_zero(address: Address) -> Option<Address> {
    (address != Address::ZERO).then_some(address)
}

impl TeamView {
    fn into_participant(self) -> Result<Participant, LedgerError> {
        Ok(Participant::new(
            self.owner,
            Team::new(
                to_u64(self.firstMonster, "firstMonster")?,
                to_u64(self.secondMonster, "secondMonster")?,
            ),
        ))
    }
}

impl From<MoveCommit> for PendingMove {
    fn from(value: MoveCommit) -> Self {
        PendingMove {
            commit: value.commit,
            revealed: non_zero(value.moveAddress).map(MoveRef),
        }
    }
}

impl MatchView {
    /// Converts the ledger view; id 0 means "no match".
    pub fn into_match(self) -> Result<Option<Match>, LedgerError> {
        let id = MatchId(to_u64(self.id, "id")?);
        if id.is_none() {
            return Ok(None);
        }
        let data = self.data;
        let phase = Phase::from_u8(data.phase)
            .ok_or_else(|| LedgerError::InvalidData(format!("unknown phase {}", data.phase)))?;
        let timeout = to_u64(data.timeout, "timeout")?;

        Ok(Some(Match {
            id,
            participants: [
                data.challengerTeam.into_participant()?,
                data.opponentTeam.into_participant()?,
            ],
            phase,
            round: to_u64(data.round, "round")?,
            pending_moves: [
                data.currentChallengerMove.into(),
                data.currentOpponentMove.into(),
            ],
            timeout_at: (timeout != 0).then_some(timeout),
            escaped: non_zero(data.escaped),
        }))
    }
}

impl LogEntry {
    pub fn into_record(self) -> Result<RawLogRecord, LedgerError> {
        Ok(RawLogRecord {
            id: to_u64(self.id, "log id")?,
            discriminant: to_u64(self.action, "action")?,
            timestamp: to_u64(self.timestamp, "timestamp")?,
            data: self.data.to_vec(),
        })
    }
}

impl ChallengeView {
    pub fn into_challenge(self, mode: battle_core::GameMode) -> Result<Challenge, LedgerError> {
        let status = match self.status {
            0 => ChallengeStatus::Pending,
            1 => ChallengeStatus::Accepted,
            2 => ChallengeStatus::Rejected,
            other => {
                return Err(LedgerError::InvalidData(format!(
                    "unknown challenge status {other}"
                )));
            }
        };
        Ok(Challenge {
            id: MatchId(to_u64(self.id, "challenge id")?),
            mode,
            challenger: self.challenger,
            opponent: self.opponent,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    fn team(owner: u8, first: u64, second: u64) -> TeamView {
        TeamView {
            owner: Address::repeat_byte(owner),
            firstMonster: U256::from(first),
            secondMonster: U256::from(second),
        }
    }

    fn empty_move() -> MoveCommit {
        MoveCommit {
            commit: B256::ZERO,
            moveAddress: Address::ZERO,
        }
    }

    fn view(id: u64) -> MatchView {
        MatchView {
            id: U256::from(id),
            data: MatchData {
                challengerTeam: team(0x11, 1, 3),
                opponentTeam: team(0x22, 4, 5),
                currentChallengerMove: MoveCommit {
                    commit: B256::repeat_byte(0xcc),
                    moveAddress: Address::repeat_byte(0x33),
                },
                currentOpponentMove: empty_move(),
                escaped: Address::ZERO,
                timeout: U256::ZERO,
                round: U256::from(4),
                phase: 1,
            },
        }
    }

    #[test]
    fn zero_id_means_no_match() {
        assert_eq!(view(0).into_match().unwrap(), None);
    }

    #[test]
    fn match_view_maps_sentinels_to_options() {
        let record = view(9).into_match().unwrap().unwrap();
        assert_eq!(record.id, MatchId(9));
        assert_eq!(record.phase, Phase::Reveal);
        assert_eq!(record.round, 4);
        assert_eq!(record.timeout_at, None);
        assert_eq!(record.escaped, None);
        assert_eq!(record.participants[1].team, Team::new(4, 5));
        assert_eq!(
            record.pending_moves[0].revealed,
            Some(MoveRef(Address::repeat_byte(0x33)))
        );
        assert!(!record.pending_moves[1].is_committed());
    }

    #[test]
    fn unknown_phase_is_invalid_data() {
        let mut bad = view(1);
        bad.data.phase = 7;
        assert!(matches!(bad.into_match(), Err(LedgerError::InvalidData(_))));
    }

    #[test]
    fn oversized_words_are_rejected() {
        assert!(to_u64(U256::MAX, "round").is_err());
        assert_eq!(to_u64(U256::from(u64::MAX), "round").unwrap(), u64::MAX);
    }

    #[test]
    fn challenge_status_codes_map() {
        let challenge = ChallengeView {
            id: U256::from(3),
            challenger: Address::repeat_byte(1),
            opponent: Address::repeat_byte(2),
            status: 2,
        }
        .into_challenge(battle_core::GameMode(0))
        .unwrap();
        assert_eq!(challenge.status, ChallengeStatus::Rejected);
        assert!(!challenge.is_incoming_for(Address::repeat_byte(2)));
    }
}

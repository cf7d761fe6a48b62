//! Gateway over the deployed match maker and event logger.

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use battle_core::{GameMode, Match, MatchId, MoveRef, Team};
use client_ledger_core::{
    Challenge, LedgerError, LedgerGateway, LedgerInfo, LedgerTransport, MatchQueries, Matchmaking,
    MoveTransactions, RawLogRecord, Receipt, Result,
};

use crate::config::EvmConfig;
use crate::contracts::{IConfidentialMatchMaker, IEventLogger, IMatchMaker};
use crate::transport::JsonRpcTransport;

/// EVM ledger gateway.
///
/// Generic over the transport so tests can substitute canned responses.
pub struct EvmLedgerClient<T = JsonRpcTransport> {
    transport: T,
    match_maker: Address,
    event_logger: Address,
    network: String,
}

impl EvmLedgerClient<JsonRpcTransport> {
    pub fn connect(config: &EvmConfig) -> Result<Self> {
        let transport = JsonRpcTransport::new(config)?;
        Ok(Self::with_transport(transport, config))
    }
}

impl<T: LedgerTransport> EvmLedgerClient<T> {
    pub fn with_transport(transport: T, config: &EvmConfig) -> Self {
        Self {
            transport,
            match_maker: config.match_maker,
            event_logger: config.event_logger,
            network: config.network.clone(),
        }
    }

    async fn read<C: SolCall + Send>(&self, to: Address, call: C) -> Result<C::Return> {
        let output = self.transport.call(to, call.abi_encode()).await?;
        C::abi_decode_returns(&output, true)
            .map_err(|e| LedgerError::InvalidData(format!("{}: {e}", C::SIGNATURE)))
    }

    async fn write<C: SolCall + Send>(&self, call: C) -> Result<Receipt> {
        tracing::debug!(target: "ledger::evm", call = C::SIGNATURE, "Submitting");
        self.transport.send(self.match_maker, call.abi_encode()).await
    }
}

fn word(value: u64) -> U256 {
    U256::from(value)
}

#[async_trait]
impl<T: LedgerTransport> MatchQueries for EvmLedgerClient<T> {
    async fn get_match_by_participant(&self, participant: Address) -> Result<Option<Match>> {
        let view = self
            .read(
                self.match_maker,
                IMatchMaker::getMatchByUserCall { user: participant },
            )
            .await?
            ._0;
        view.into_match()
    }

    async fn get_match(&self, match_id: MatchId) -> Result<Match> {
        let view = self
            .read(
                self.match_maker,
                IMatchMaker::getMatchByIdCall {
                    matchId: word(match_id.0),
                },
            )
            .await?
            ._0;
        view.into_match()?.ok_or(LedgerError::MatchNotFound(match_id))
    }

    async fn fetch_log_page(&self, match_id: MatchId, offset: u64) -> Result<Vec<RawLogRecord>> {
        let entries = self
            .read(
                self.event_logger,
                IEventLogger::getLogsCall {
                    matchId: word(match_id.0),
                    offset: word(offset),
                },
            )
            .await?
            ._0;
        entries.into_iter().map(|entry| entry.into_record()).collect()
    }
}

#[async_trait]
impl<T: LedgerTransport> MoveTransactions for EvmLedgerClient<T> {
    async fn submit_commit(&self, match_id: MatchId, commit: B256) -> Result<Receipt> {
        self.write(IMatchMaker::commitCall {
            matchId: word(match_id.0),
            moveCommit: commit,
        })
        .await
    }

    async fn submit_reveal(&self, match_id: MatchId, mv: MoveRef, secret: B256) -> Result<Receipt> {
        self.write(IMatchMaker::revealCall {
            matchId: word(match_id.0),
            moveAddress: mv.address(),
            secret,
        })
        .await
    }

    async fn submit_open_move(&self, match_id: MatchId, mv: MoveRef) -> Result<Receipt> {
        self.write(IConfidentialMatchMaker::revealCall {
            matchId: word(match_id.0),
            moveAddress: mv.address(),
        })
        .await
    }

    async fn withdraw(&self, match_id: MatchId) -> Result<Receipt> {
        self.write(IMatchMaker::withdrawFromMatchCall {
            matchId: word(match_id.0),
        })
        .await
    }
}

#[async_trait]
impl<T: LedgerTransport> Matchmaking for EvmLedgerClient<T> {
    async fn join_queue(&self, mode: GameMode, team: Team) -> Result<Receipt> {
        self.write(IMatchMaker::createAndJoinCall {
            mode: word(mode.0),
            firstMonster: word(team.units[0]),
            secondMonster: word(team.units[1]),
        })
        .await
    }

    async fn leave_queue(&self, mode: GameMode) -> Result<Receipt> {
        self.write(IMatchMaker::withdrawCall { mode: word(mode.0) })
            .await
    }

    async fn queued_participant(&self, mode: GameMode) -> Result<Option<Address>> {
        let queued = self
            .read(
                self.match_maker,
                IMatchMaker::queuedTeamsCall { mode: word(mode.0) },
            )
            .await?;
        Ok((queued.owner != Address::ZERO).then_some(queued.owner))
    }

    async fn challenge(&self, mode: GameMode, team: Team, opponent: Address) -> Result<Receipt> {
        self.write(IMatchMaker::challengeOponentCall {
            mode: word(mode.0),
            firstMonster: word(team.units[0]),
            secondMonster: word(team.units[1]),
            opponent,
        })
        .await
    }

    async fn accept_challenge(&self, challenge_id: MatchId, team: Team) -> Result<MatchId> {
        self.write(IMatchMaker::acceptChallengeCall {
            challengeId: word(challenge_id.0),
            firstMonster: word(team.units[0]),
            secondMonster: word(team.units[1]),
        })
        .await?;

        // The call returns nothing; read back the match it created.
        let participant = self.transport.sender();
        self.get_match_by_participant(participant)
            .await?
            .map(|created| created.id)
            .ok_or_else(|| {
                LedgerError::InvalidData(format!(
                    "challenge {challenge_id} accepted but no match found"
                ))
            })
    }

    async fn reject_challenge(&self, challenge_id: MatchId) -> Result<Receipt> {
        self.write(IMatchMaker::rejectChallengeCall {
            challengeId: word(challenge_id.0),
        })
        .await
    }

    async fn list_challenges(
        &self,
        participant: Address,
        mode: GameMode,
    ) -> Result<Vec<Challenge>> {
        let views = self
            .read(
                self.match_maker,
                IMatchMaker::getChallengeListByUserCall {
                    user: participant,
                    mode: word(mode.0),
                },
            )
            .await?
            ._0;
        views
            .into_iter()
            .map(|view| view.into_challenge(mode))
            .collect()
    }
}

#[async_trait]
impl<T: LedgerTransport> LedgerGateway for EvmLedgerClient<T> {
    fn info(&self) -> LedgerInfo {
        LedgerInfo {
            backend: "evm",
            network: self.network.clone(),
            participant: self.transport.sender(),
        }
    }

    async fn health_check(&self) -> Result<()> {
        self.transport.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use alloy_sol_types::SolType;
    use battle_core::{MoveCatalog, Phase};
    use client_ledger_core::RejectionReason;

    use super::*;
    use crate::contracts::{MatchData, MatchView, MoveCommit, TeamView};

    /// Transport that records calldata and replays queued responses.
    #[derive(Default)]
    struct ScriptedTransport {
        calls: Mutex<Vec<(Address, Vec<u8>)>>,
        responses: Mutex<VecDeque<Result<Vec<u8>>>>,
    }

    impl ScriptedTransport {
        fn respond(&self, response: Result<Vec<u8>>) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn next(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>> {
            self.calls.lock().unwrap().push((to, data));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[async_trait]
    impl LedgerTransport for ScriptedTransport {
        async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>> {
            self.next(to, data)
        }

        async fn send(&self, to: Address, data: Vec<u8>) -> Result<Receipt> {
            self.next(to, data).map(|_| Receipt {
                tx_hash: B256::repeat_byte(0xee),
                block_number: Some(1),
            })
        }

        fn sender(&self) -> Address {
            Address::repeat_byte(0x11)
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    fn config() -> EvmConfig {
        EvmConfig {
            rpc_url: "http://127.0.0.1:8545".into(),
            network: "local".into(),
            participant: Address::repeat_byte(0x11),
            match_maker: Address::repeat_byte(0xaa),
            event_logger: Address::repeat_byte(0xbb),
            reveal_only: false,
            gas_limit: 5_000_000,
            receipt_timeout: Duration::from_secs(1),
            request_timeout: Duration::from_secs(1),
            catalog: MoveCatalog::default(),
        }
    }

    fn encoded_view(id: u64) -> Vec<u8> {
        let team = |owner: u8| TeamView {
            owner: Address::repeat_byte(owner),
            firstMonster: U256::from(1),
            secondMonster: U256::from(2),
        };
        let empty = || MoveCommit {
            commit: B256::ZERO,
            moveAddress: Address::ZERO,
        };
        let view = MatchView {
            id: U256::from(id),
            data: MatchData {
                challengerTeam: team(0x11),
                opponentTeam: team(0x22),
                currentChallengerMove: empty(),
                currentOpponentMove: empty(),
                escaped: Address::ZERO,
                timeout: U256::from(1_700_000_600u64),
                round: U256::from(2),
                phase: 0,
            },
        };
        // MatchView is a static struct, so its encoding equals the return tuple's.
        MatchView::abi_encode(&view)
    }

    #[tokio::test]
    async fn match_lookup_decodes_view() {
        let transport = ScriptedTransport::default();
        transport.respond(Ok(encoded_view(5)));
        let client = EvmLedgerClient::with_transport(transport, &config());

        let record = client
            .get_match_by_participant(Address::repeat_byte(0x11))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.id, MatchId(5));
        assert_eq!(record.phase, Phase::Commit);
        assert_eq!(record.timeout_at, Some(1_700_000_600));

        let calls = client.transport.calls.lock().unwrap();
        assert_eq!(calls[0].0, Address::repeat_byte(0xaa));
        assert_eq!(&calls[0].1[..4], IMatchMaker::getMatchByUserCall::SELECTOR.as_slice());
    }

    #[tokio::test]
    async fn missing_match_by_id_is_not_found() {
        let transport = ScriptedTransport::default();
        transport.respond(Ok(encoded_view(0)));
        let client = EvmLedgerClient::with_transport(transport, &config());

        let err = client.get_match(MatchId(3)).await.unwrap_err();
        assert!(matches!(err, LedgerError::MatchNotFound(MatchId(3))));
    }

    #[tokio::test]
    async fn commit_targets_match_maker_with_commit_selector() {
        let client = EvmLedgerClient::with_transport(ScriptedTransport::default(), &config());
        client
            .submit_commit(MatchId(8), B256::repeat_byte(0x42))
            .await
            .unwrap();

        let calls = client.transport.calls.lock().unwrap();
        let (to, data) = &calls[0];
        assert_eq!(*to, Address::repeat_byte(0xaa));
        let decoded = IMatchMaker::commitCall::abi_decode(data, true).unwrap();
        assert_eq!(decoded.matchId, U256::from(8));
        assert_eq!(decoded.moveCommit, B256::repeat_byte(0x42));
    }

    #[tokio::test]
    async fn open_move_uses_reveal_only_signature() {
        let client = EvmLedgerClient::with_transport(ScriptedTransport::default(), &config());
        let mv = MoveRef(Address::repeat_byte(0x33));
        client.submit_open_move(MatchId(1), mv).await.unwrap();

        let calls = client.transport.calls.lock().unwrap();
        assert_eq!(
            &calls[0].1[..4],
            IConfidentialMatchMaker::revealCall::SELECTOR.as_slice()
        );
        assert_ne!(
            IConfidentialMatchMaker::revealCall::SELECTOR,
            IMatchMaker::revealCall::SELECTOR
        );
    }

    #[tokio::test]
    async fn rejections_pass_through() {
        let transport = ScriptedTransport::default();
        transport.respond(Err(LedgerError::rejected("MatchMakerV2: game over")));
        let client = EvmLedgerClient::with_transport(transport, &config());

        let err = client.withdraw(MatchId(1)).await.unwrap_err();
        assert_eq!(
            err.rejection().map(|r| r.reason.clone()),
            Some(RejectionReason::GameOver)
        );
    }

    #[tokio::test]
    async fn garbage_return_data_is_invalid() {
        let transport = ScriptedTransport::default();
        transport.respond(Ok(vec![1, 2, 3]));
        let client = EvmLedgerClient::with_transport(transport, &config());

        let err = client.queued_participant(GameMode(0)).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidData(_)));
    }
}

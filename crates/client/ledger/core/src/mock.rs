//! Mock ledger for testing and offline simulation.
//!
//! [`MockLedger`] holds shared in-memory state; [`MockLedger::client`] hands out
//! a [`MockClient`] per participant that implements the full gateway. The mock
//! follows the deployed match engine closely enough to exercise the protocol:
//! queue pairing, challenges, commit → reveal → next round, commitment checks,
//! reveal-only play, forfeits, and the per-match event log.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use battle_core::events::{self, EventKind};
use battle_core::{
    Address, B256, ChallengeMode, DecodedEvent, Domain, GameMode, Match, MatchId, MoveRef,
    Participant, Phase, Seat, Team, commitment,
};
use tokio::sync::{Notify, Semaphore, mpsc};

use crate::traits::{
    LedgerError, LedgerGateway, MatchQueries, Matchmaking, MoveTransactions, ProtocolEventSource,
    Result, TransportError,
};
use crate::types::{
    Challenge, ChallengeStatus, EVENT_PAGE_SIZE, LedgerInfo, RawLogRecord, Receipt,
};

/// Ledger operations that can be counted, failed or held.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MockOp {
    GetMatch,
    LogPage,
    Commit,
    Reveal,
    OpenMove,
    Withdraw,
    JoinQueue,
    LeaveQueue,
    Challenge,
    AcceptChallenge,
    RejectChallenge,
}

/// Injected failure for the next call of an operation.
#[derive(Clone, Debug)]
pub enum MockFault {
    Transport,
    Reject(String),
    /// The call takes effect but the caller sees a timeout, like a
    /// transaction whose receipt never arrived. Submissions only.
    LostResponse,
}

/// Blocks an operation until released; lets tests hold a call in flight.
pub struct SubmissionGate {
    entered: Notify,
    permits: Semaphore,
}

impl Default for SubmissionGate {
    fn default() -> Self {
        Self {
            entered: Notify::new(),
            permits: Semaphore::new(0),
        }
    }
}

impl SubmissionGate {
    /// Resolves once a call has reached the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Lets `count` held calls proceed.
    pub fn release(&self, count: usize) {
        self.permits.add_permits(count);
    }

    async fn pass(&self) {
        self.entered.notify_one();
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

struct MockMatch {
    record: Match,
    mode: GameMode,
    reveal_only: bool,
    withdrawn: HashSet<Address>,
    log: Vec<RawLogRecord>,
}

struct State {
    matches: BTreeMap<MatchId, MockMatch>,
    queue: HashMap<GameMode, (Address, Team)>,
    challenges: Vec<Challenge>,
    challenge_teams: HashMap<MatchId, Team>,
    modes: HashMap<GameMode, ChallengeMode>,
    reveal_only_modes: HashSet<GameMode>,
    rounds_to_finish: Option<u64>,
    next_match_id: u64,
    next_log_id: u64,
    next_tx: u64,
    now: u64,
    calls: HashMap<MockOp, usize>,
    faults: HashMap<MockOp, VecDeque<MockFault>>,
    gates: HashMap<MockOp, Arc<SubmissionGate>>,
    subscribers: HashMap<MatchId, Vec<mpsc::Sender<DecodedEvent>>>,
}

impl State {
    fn new() -> Self {
        Self {
            matches: BTreeMap::new(),
            queue: HashMap::new(),
            challenges: Vec::new(),
            challenge_teams: HashMap::new(),
            modes: HashMap::new(),
            reveal_only_modes: HashSet::new(),
            rounds_to_finish: None,
            next_match_id: 1,
            next_log_id: 1,
            next_tx: 0,
            now: 1_700_000_000,
            calls: HashMap::new(),
            faults: HashMap::new(),
            gates: HashMap::new(),
            subscribers: HashMap::new(),
        }
    }

    fn receipt(&mut self) -> Receipt {
        self.next_tx += 1;
        let mut hash = [0u8; 32];
        hash[24..].copy_from_slice(&self.next_tx.to_be_bytes());
        Receipt {
            tx_hash: B256::new(hash),
            block_number: Some(self.next_tx),
        }
    }

    fn allocate_match_id(&mut self) -> MatchId {
        let id = MatchId(self.next_match_id);
        self.next_match_id += 1;
        id
    }

    fn mode(&self, mode: GameMode) -> ChallengeMode {
        self.modes.get(&mode).copied().unwrap_or_default()
    }

    fn create_match(&mut self, id: MatchId, mode: GameMode, challenger: Participant, opponent: Participant) {
        let reveal_only = self.reveal_only_modes.contains(&mode);
        tracing::debug!(target: "ledger::mock", %id, %mode, reveal_only, "Match created");
        self.matches.insert(
            id,
            MockMatch {
                record: Match::new(id, challenger, opponent),
                mode,
                reveal_only,
                withdrawn: HashSet::new(),
                log: Vec::new(),
            },
        );
    }

    fn append_event(&mut self, match_id: MatchId, kind: EventKind) {
        let (discriminant, data) = events::encode(&kind);
        let record = RawLogRecord {
            id: self.next_log_id,
            discriminant,
            timestamp: self.now,
            data,
        };
        self.next_log_id += 1;
        self.now += 1;

        if Domain::of(discriminant) == Domain::Protocol
            && let Some(event) = record.decode()
            && let Some(subscribers) = self.subscribers.get_mut(&match_id)
        {
            subscribers.retain(|tx| tx.try_send(event.clone()).is_ok());
        }

        if let Some(entry) = self.matches.get_mut(&match_id) {
            entry.log.push(record);
        }
    }

    fn seated(&mut self, match_id: MatchId, caller: Address) -> Result<(&mut MockMatch, Seat)> {
        let entry = self
            .matches
            .get_mut(&match_id)
            .ok_or(LedgerError::MatchNotFound(match_id))?;
        if entry.withdrawn.contains(&caller) {
            return Err(LedgerError::rejected("MatchMakerV2: not your match"));
        }
        let seat = entry
            .record
            .seat_of(caller)
            .ok_or_else(|| LedgerError::rejected("MatchMakerV2: not your match"))?;
        Ok((entry, seat))
    }

    /// Applies both revealed moves and opens the next round.
    fn resolve_round(&mut self, match_id: MatchId) {
        let rounds_to_finish = self.rounds_to_finish;
        let Some(entry) = self.matches.get_mut(&match_id) else {
            return;
        };
        let record = &mut entry.record;
        let Some(challenger_move) = record.pending_moves[0].revealed else {
            return;
        };
        let attacker = record.participants[0].team.units[0];
        let defender = record.participants[1].team.units[0];

        record.round += 1;
        record.pending_moves = [Default::default(); 2];
        let finished = rounds_to_finish.is_some_and(|limit| record.round >= limit);
        record.phase = if finished { Phase::GameOver } else { Phase::Commit };
        let winner = record.participants[0].identity;

        self.append_event(
            match_id,
            EventKind::Damage {
                mv: challenger_move,
                attacker,
                defender,
                damage: 10,
                elemental_multiplier: 100,
                is_critical: false,
            },
        );
        if finished {
            self.append_event(match_id, EventKind::GameOver { winner });
        }
    }
}

/// Shared in-memory ledger.
#[derive(Clone)]
pub struct MockLedger {
    state: Arc<Mutex<State>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Gateway acting as `participant`.
    pub fn client(&self, participant: Address) -> MockClient {
        MockClient {
            ledger: self.clone(),
            participant,
        }
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    pub fn set_challenge_mode(&self, mode: GameMode, challenge_mode: ChallengeMode) {
        self.lock().modes.insert(mode, challenge_mode);
    }

    /// Matches created in `mode` skip the commit step.
    pub fn set_reveal_only(&self, mode: GameMode) {
        self.lock().reveal_only_modes.insert(mode);
    }

    /// Ends matches with GameOver once `rounds` rounds have been played.
    pub fn set_rounds_to_finish(&self, rounds: u64) {
        self.lock().rounds_to_finish = Some(rounds);
    }

    pub fn set_now(&self, now: u64) {
        self.lock().now = now;
    }

    // ------------------------------------------------------------------
    // Direct state manipulation
    // ------------------------------------------------------------------

    /// Inserts a match in `mode` 0 as-is, replacing any existing record.
    pub fn insert_match(&self, record: Match) {
        let mut state = self.lock();
        state.next_match_id = state.next_match_id.max(record.id.0 + 1);
        state.matches.insert(
            record.id,
            MockMatch {
                record,
                mode: GameMode(0),
                reveal_only: false,
                withdrawn: HashSet::new(),
                log: Vec::new(),
            },
        );
    }

    pub fn match_record(&self, match_id: MatchId) -> Option<Match> {
        self.lock().matches.get(&match_id).map(|m| m.record.clone())
    }

    /// Number of records in a match log.
    pub fn log_len(&self, match_id: MatchId) -> usize {
        self.lock().matches.get(&match_id).map_or(0, |m| m.log.len())
    }

    /// Mutates a stored match in place.
    pub fn update_match(&self, match_id: MatchId, update: impl FnOnce(&mut Match)) {
        if let Some(entry) = self.lock().matches.get_mut(&match_id) {
            update(&mut entry.record);
        }
    }

    /// Records `participant` as having forfeited the match.
    pub fn forfeit(&self, match_id: MatchId, participant: Address) {
        self.update_match(match_id, |record| record.escaped = Some(participant));
    }

    /// Commits on behalf of `participant`, bypassing call accounting.
    pub fn commit_as(&self, match_id: MatchId, participant: Address, mv: MoveRef) {
        let hash = commitment(mv, &battle_core::COMMIT_SECRET);
        let mut state = self.lock();
        if let Ok((entry, seat)) = state.seated(match_id, participant) {
            entry.record.pending_moves[seat.index()].commit = hash;
            if entry.record.pending_moves.iter().all(|m| m.is_committed()) {
                entry.record.phase = Phase::Reveal;
            }
        }
        state.append_event(match_id, EventKind::CommitMove { player: participant, commit: hash });
    }

    /// Reveals on behalf of `participant`, bypassing call accounting.
    pub fn reveal_as(&self, match_id: MatchId, participant: Address, mv: MoveRef) {
        let mut state = self.lock();
        let mut both = false;
        if let Ok((entry, seat)) = state.seated(match_id, participant) {
            entry.record.pending_moves[seat.index()].revealed = Some(mv);
            both = entry.record.pending_moves.iter().all(|m| m.is_revealed());
        }
        state.append_event(match_id, EventKind::RevealMove { player: participant, mv });
        if both {
            state.resolve_round(match_id);
        }
    }

    /// Appends an arbitrary event to a match log.
    pub fn push_event(&self, match_id: MatchId, kind: EventKind) {
        self.lock().append_event(match_id, kind);
    }

    /// Appends a raw record, e.g. one with an unknown discriminant.
    pub fn push_raw(&self, match_id: MatchId, discriminant: u64, data: Vec<u8>) {
        let mut state = self.lock();
        let record = RawLogRecord {
            id: state.next_log_id,
            discriminant,
            timestamp: state.now,
            data,
        };
        state.next_log_id += 1;
        if let Some(entry) = state.matches.get_mut(&match_id) {
            entry.log.push(record);
        }
    }

    pub fn challenges(&self) -> Vec<Challenge> {
        self.lock().challenges.clone()
    }

    // ------------------------------------------------------------------
    // Instrumentation
    // ------------------------------------------------------------------

    /// Number of calls made to `op` (including failed ones).
    pub fn calls(&self, op: MockOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Fails the next call to `op` with `fault`. Faults queue up per op.
    pub fn fail_next(&self, op: MockOp, fault: MockFault) {
        self.lock().faults.entry(op).or_default().push_back(fault);
    }

    /// Holds every call to `op` at a gate until released.
    pub fn hold(&self, op: MockOp) -> Arc<SubmissionGate> {
        let gate = Arc::new(SubmissionGate::default());
        self.lock().gates.insert(op, Arc::clone(&gate));
        gate
    }

    pub fn unhold(&self, op: MockOp) {
        self.lock().gates.remove(&op);
    }

    /// Counts the call, waits at any gate, then applies any injected fault.
    ///
    /// Returns true when the call should take effect but report a timeout.
    async fn enter(&self, op: MockOp) -> Result<bool> {
        let gate = {
            let mut state = self.lock();
            *state.calls.entry(op).or_default() += 1;
            state.gates.get(&op).cloned()
        };
        if let Some(gate) = gate {
            gate.pass().await;
        }

        let fault = self.lock().faults.get_mut(&op).and_then(VecDeque::pop_front);
        match fault {
            None => Ok(false),
            Some(MockFault::LostResponse) => Ok(true),
            Some(MockFault::Transport) => Err(TransportError::Network(format!(
                "injected transport fault for {op:?}"
            ))
            .into()),
            Some(MockFault::Reject(message)) => Err(LedgerError::rejected(message)),
        }
    }
}

fn deliver(lost: bool, receipt: Receipt) -> Result<Receipt> {
    if lost {
        return Err(TransportError::Timeout(30_000).into());
    }
    Ok(receipt)
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Gateway view of a [`MockLedger`] for one participant.
#[derive(Clone)]
pub struct MockClient {
    ledger: MockLedger,
    participant: Address,
}

impl MockClient {
    pub fn ledger(&self) -> &MockLedger {
        &self.ledger
    }
}

#[async_trait]
impl MatchQueries for MockClient {
    async fn get_match_by_participant(&self, participant: Address) -> Result<Option<Match>> {
        self.ledger.enter(MockOp::GetMatch).await?;
        let state = self.ledger.lock();
        Ok(state
            .matches
            .values()
            .filter(|m| !m.withdrawn.contains(&participant))
            .find(|m| m.record.seat_of(participant).is_some())
            .map(|m| m.record.clone()))
    }

    async fn get_match(&self, match_id: MatchId) -> Result<Match> {
        self.ledger.enter(MockOp::GetMatch).await?;
        self.ledger
            .lock()
            .matches
            .get(&match_id)
            .map(|m| m.record.clone())
            .ok_or(LedgerError::MatchNotFound(match_id))
    }

    async fn fetch_log_page(&self, match_id: MatchId, offset: u64) -> Result<Vec<RawLogRecord>> {
        self.ledger.enter(MockOp::LogPage).await?;
        let state = self.ledger.lock();
        let log = state
            .matches
            .get(&match_id)
            .map(|m| m.log.as_slice())
            .unwrap_or_default();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(log.len());
        let end = (start + EVENT_PAGE_SIZE).min(log.len());
        Ok(log[start..end].to_vec())
    }
}

#[async_trait]
impl MoveTransactions for MockClient {
    async fn submit_commit(&self, match_id: MatchId, commit: B256) -> Result<Receipt> {
        let lost = self.ledger.enter(MockOp::Commit).await?;
        let mut state = self.ledger.lock();
        let (entry, seat) = state.seated(match_id, self.participant)?;
        if entry.record.phase == Phase::GameOver {
            return Err(LedgerError::rejected("MatchMakerV2: game over"));
        }
        if entry.reveal_only {
            return Err(LedgerError::rejected("MatchMakerV2: mode does not use commits"));
        }
        if entry.record.phase != Phase::Commit || entry.record.pending_move(seat).is_committed() {
            return Err(LedgerError::rejected(
                "MatchMakerV2: can no longer commit to match",
            ));
        }

        entry.record.pending_moves[seat.index()].commit = commit;
        if entry.record.pending_moves.iter().all(|m| m.is_committed()) {
            entry.record.phase = Phase::Reveal;
        }
        state.append_event(
            match_id,
            EventKind::CommitMove {
                player: self.participant,
                commit,
            },
        );
        deliver(lost, state.receipt())
    }

    async fn submit_reveal(&self, match_id: MatchId, mv: MoveRef, secret: B256) -> Result<Receipt> {
        let lost = self.ledger.enter(MockOp::Reveal).await?;
        let mut state = self.ledger.lock();
        let (entry, seat) = state.seated(match_id, self.participant)?;
        if entry.record.phase == Phase::GameOver {
            return Err(LedgerError::rejected("MatchMakerV2: game over"));
        }
        if entry.record.phase != Phase::Reveal || entry.record.pending_move(seat).is_revealed() {
            return Err(LedgerError::rejected("MatchMakerV2: not in reveal phase"));
        }
        if commitment(mv, &secret) != entry.record.pending_move(seat).commit {
            return Err(LedgerError::rejected("MatchMakerV2: invalid reveal"));
        }

        entry.record.pending_moves[seat.index()].revealed = Some(mv);
        let both = entry.record.pending_moves.iter().all(|m| m.is_revealed());
        state.append_event(
            match_id,
            EventKind::RevealMove {
                player: self.participant,
                mv,
            },
        );
        if both {
            state.resolve_round(match_id);
        }
        deliver(lost, state.receipt())
    }

    async fn submit_open_move(&self, match_id: MatchId, mv: MoveRef) -> Result<Receipt> {
        let lost = self.ledger.enter(MockOp::OpenMove).await?;
        let mut state = self.ledger.lock();
        let (entry, seat) = state.seated(match_id, self.participant)?;
        if entry.record.phase == Phase::GameOver {
            return Err(LedgerError::rejected("MatchMakerV2: game over"));
        }
        if !entry.reveal_only {
            return Err(LedgerError::rejected("MatchMakerV2: not in reveal phase"));
        }
        if entry.record.pending_move(seat).is_revealed() {
            return Err(LedgerError::rejected(
                "MatchMakerV2: can no longer commit to match",
            ));
        }

        entry.record.pending_moves[seat.index()].revealed = Some(mv);
        let both = entry.record.pending_moves.iter().all(|m| m.is_revealed());
        state.append_event(
            match_id,
            EventKind::RevealMove {
                player: self.participant,
                mv,
            },
        );
        if both {
            state.resolve_round(match_id);
        }
        deliver(lost, state.receipt())
    }

    async fn withdraw(&self, match_id: MatchId) -> Result<Receipt> {
        self.ledger.enter(MockOp::Withdraw).await?;
        let mut state = self.ledger.lock();
        let participant = self.participant;
        let (entry, _) = state.seated(match_id, participant)?;
        if entry.record.phase != Phase::GameOver && entry.record.escaped.is_none() {
            entry.record.escaped = Some(participant);
        }
        entry.withdrawn.insert(participant);
        tracing::debug!(target: "ledger::mock", %match_id, %participant, "Participant withdrew");
        Ok(state.receipt())
    }
}

#[async_trait]
impl Matchmaking for MockClient {
    async fn join_queue(&self, mode: GameMode, team: Team) -> Result<Receipt> {
        self.ledger.enter(MockOp::JoinQueue).await?;
        let mut state = self.ledger.lock();
        if !state.mode(mode).allows_queue() {
            return Err(LedgerError::rejected(
                "MMV3: This mode supports challenge only",
            ));
        }

        match state.queue.get(&mode).copied() {
            None => {
                state.queue.insert(mode, (self.participant, team));
            }
            Some((queued, _)) if queued == self.participant => {
                return Err(LedgerError::rejected("MMV3: already in queue"));
            }
            Some((queued, queued_team)) => {
                state.queue.remove(&mode);
                let id = state.allocate_match_id();
                state.create_match(
                    id,
                    mode,
                    Participant::new(queued, queued_team),
                    Participant::new(self.participant, team),
                );
            }
        }
        Ok(state.receipt())
    }

    async fn leave_queue(&self, mode: GameMode) -> Result<Receipt> {
        self.ledger.enter(MockOp::LeaveQueue).await?;
        let mut state = self.ledger.lock();
        if state.queue.get(&mode).is_some_and(|(queued, _)| *queued == self.participant) {
            state.queue.remove(&mode);
        }
        Ok(state.receipt())
    }

    async fn queued_participant(&self, mode: GameMode) -> Result<Option<Address>> {
        Ok(self.ledger.lock().queue.get(&mode).map(|(queued, _)| *queued))
    }

    async fn challenge(&self, mode: GameMode, team: Team, opponent: Address) -> Result<Receipt> {
        self.ledger.enter(MockOp::Challenge).await?;
        let mut state = self.ledger.lock();
        if !state.mode(mode).allows_challenge() {
            return Err(LedgerError::rejected("MMV3: This mode supports queue only"));
        }
        let duplicate = state.challenges.iter().any(|c| {
            c.mode == mode && c.is_outgoing_for(self.participant) && c.opponent == opponent
        });
        if duplicate {
            return Err(LedgerError::rejected(
                "MMV3: you already challenged this player",
            ));
        }

        let id = state.allocate_match_id();
        state.challenges.push(Challenge {
            id,
            mode,
            challenger: self.participant,
            opponent,
            status: ChallengeStatus::Pending,
        });
        // The challenger's team is fixed at challenge time.
        state.challenge_teams.insert(id, team);
        Ok(state.receipt())
    }

    async fn accept_challenge(&self, challenge_id: MatchId, team: Team) -> Result<MatchId> {
        self.ledger.enter(MockOp::AcceptChallenge).await?;
        let mut state = self.ledger.lock();
        let participant = self.participant;
        let Some(challenge) = state
            .challenges
            .iter_mut()
            .find(|c| c.id == challenge_id && c.is_incoming_for(participant))
        else {
            return Err(LedgerError::rejected("MMV3: Not challenged"));
        };
        challenge.status = ChallengeStatus::Accepted;
        let (mode, challenger) = (challenge.mode, challenge.challenger);
        let challenger_team = state
            .challenge_teams
            .remove(&challenge_id)
            .unwrap_or_default();

        state.create_match(
            challenge_id,
            mode,
            Participant::new(challenger, challenger_team),
            Participant::new(participant, team),
        );
        Ok(challenge_id)
    }

    async fn reject_challenge(&self, challenge_id: MatchId) -> Result<Receipt> {
        self.ledger.enter(MockOp::RejectChallenge).await?;
        let mut state = self.ledger.lock();
        let participant = self.participant;
        let Some(challenge) = state.challenges.iter_mut().find(|c| {
            c.id == challenge_id
                && c.is_pending()
                && (c.challenger == participant || c.opponent == participant)
        }) else {
            return Err(LedgerError::rejected("MMV3: Not challenged"));
        };
        challenge.status = ChallengeStatus::Rejected;
        Ok(state.receipt())
    }

    async fn list_challenges(
        &self,
        participant: Address,
        mode: GameMode,
    ) -> Result<Vec<Challenge>> {
        Ok(self
            .ledger
            .lock()
            .challenges
            .iter()
            .filter(|c| c.mode == mode && (c.challenger == participant || c.opponent == participant))
            .copied()
            .collect())
    }
}

#[async_trait]
impl ProtocolEventSource for MockClient {
    async fn subscribe(&self, match_id: MatchId) -> Result<mpsc::Receiver<DecodedEvent>> {
        let (tx, rx) = mpsc::channel(64);
        self.ledger
            .lock()
            .subscribers
            .entry(match_id)
            .or_default()
            .push(tx);
        Ok(rx)
    }
}

#[async_trait]
impl LedgerGateway for MockClient {
    fn info(&self) -> LedgerInfo {
        LedgerInfo {
            backend: "mock",
            network: "in-memory".to_string(),
            participant: self.participant,
        }
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

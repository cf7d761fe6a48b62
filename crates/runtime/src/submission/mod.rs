//! Move submission state machine.
//!
//! [`MoveSubmitter`] owns the local side of the commit-reveal protocol for
//! one participant: it hashes and submits commitments, persists the move
//! behind each accepted commitment, reveals it from memory or the durable
//! store, and withdraws from finished matches.
//!
//! Submissions are idempotent against the ledger snapshot: a commit the
//! ledger already holds, or a reveal for a round that has already resolved,
//! returns [`SubmitOutcome::AlreadyDone`] without a network call.
//!
//! A failed submission is never taken at face value. A receipt timeout can
//! hide a transaction that landed, so every resend and every final error is
//! checked against a fresh read of the match first.
mod retry;

pub use retry::with_retry;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use battle_core::{Address, B256, COMMIT_SECRET, Match, MatchId, MoveRef, Phase, Seat};
use client_ledger_core::{LedgerError, LedgerGateway, Receipt, RejectionReason};
use tracing::{debug, info, warn};

use crate::api::{Result, RuntimeError};
use crate::config::{ProtocolMode, RetryPolicy};
use crate::repository::{PendingCommit, PendingCommitRepository};

/// Where the local participant stands in the current round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubmissionState {
    #[default]
    Idle,
    Committing,
    Committed {
        pending: PendingCommit,
        /// False while the PendingCommit exists only in memory.
        persisted: bool,
    },
    Revealing,
    Revealed {
        match_id: MatchId,
        round: u64,
    },
}

/// Result of a successful submission call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Committed {
        pending: PendingCommit,
        persisted: bool,
        /// `None` when the commitment was found on the ledger after a retry.
        receipt: Option<Receipt>,
    },
    Revealed {
        match_id: MatchId,
        round: u64,
        mv: MoveRef,
        receipt: Option<Receipt>,
    },
    /// Nothing to do for this snapshot.
    AlreadyDone,
}

/// One ledger write that can be recognised in a later match read.
#[derive(Clone, Copy, Debug)]
enum Submission {
    Commit { seat: Seat, commit: B256 },
    Reveal { seat: Seat, round: u64, mv: MoveRef },
    Open { seat: Seat, round: u64, mv: MoveRef },
}

impl Submission {
    fn operation(self) -> &'static str {
        match self {
            Submission::Commit { .. } => "commit",
            Submission::Reveal { .. } => "reveal",
            Submission::Open { .. } => "open_move",
        }
    }

    fn is_reflected_in(self, current: &Match) -> bool {
        match self {
            Submission::Commit { seat, commit } => current.pending_move(seat).commit == commit,
            Submission::Reveal { seat, round, mv } | Submission::Open { seat, round, mv } => {
                current.round > round || current.pending_move(seat).revealed == Some(mv)
            }
        }
    }
}

pub struct MoveSubmitter {
    gateway: Arc<dyn LedgerGateway>,
    store: Arc<dyn PendingCommitRepository>,
    participant: Address,
    retry: RetryPolicy,
    state: Mutex<SubmissionState>,
}

impl MoveSubmitter {
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        store: Arc<dyn PendingCommitRepository>,
        retry: RetryPolicy,
    ) -> Self {
        let participant = gateway.participant();
        Self {
            gateway,
            store,
            participant,
            retry,
            state: Mutex::new(SubmissionState::Idle),
        }
    }

    pub fn participant(&self) -> Address {
        self.participant
    }

    pub fn state(&self) -> SubmissionState {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, SubmissionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets a new state and returns the previous one.
    fn transition(&self, next: SubmissionState) -> SubmissionState {
        std::mem::replace(&mut *self.lock(), next)
    }

    fn seat(&self, snapshot: &Match) -> Result<Seat> {
        snapshot
            .seat_of(self.participant)
            .ok_or(RuntimeError::NotSeated(snapshot.id))
    }

    /// Submits `mv` for the snapshot's round using the configured protocol.
    pub async fn play(
        &self,
        snapshot: &Match,
        mv: MoveRef,
        protocol: ProtocolMode,
    ) -> Result<SubmitOutcome> {
        match protocol {
            ProtocolMode::CommitReveal => self.commit(snapshot, mv).await,
            ProtocolMode::RevealOnly => self.play_open(snapshot, mv).await,
        }
    }

    /// Commits to `mv` for the snapshot's round.
    pub async fn commit(&self, snapshot: &Match, mv: MoveRef) -> Result<SubmitOutcome> {
        let seat = self.seat(snapshot)?;
        let (match_id, round) = (snapshot.id, snapshot.round);

        if snapshot.pending_move(seat).is_committed() {
            debug!(target: "runtime::submission", %match_id, round, "Commit already on ledger");
            return Ok(SubmitOutcome::AlreadyDone);
        }
        if let SubmissionState::Committed { pending, .. } = self.state()
            && pending.is_for(match_id, round)
        {
            return Ok(SubmitOutcome::AlreadyDone);
        }
        if snapshot.phase != Phase::Commit {
            return Err(RuntimeError::NotYet {
                match_id,
                action: "commit",
            });
        }

        let pending = PendingCommit::new(match_id, mv, round);
        let commit = pending.commitment();
        let previous = self.transition(SubmissionState::Committing);

        let receipt = match self
            .submit_guarded(match_id, Submission::Commit { seat, commit })
            .await
        {
            Ok(receipt) => receipt,
            Err(error) => {
                self.transition(previous);
                return Err(error.into());
            }
        };

        let persisted = match self.store.save(self.participant, &pending) {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    target: "runtime::submission",
                    %match_id,
                    round,
                    %error,
                    "Commit accepted but PendingCommit not persisted"
                );
                false
            }
        };

        self.transition(SubmissionState::Committed { pending, persisted });
        info!(target: "runtime::submission", %match_id, round, %mv, persisted, "Move committed");

        Ok(SubmitOutcome::Committed {
            pending,
            persisted,
            receipt,
        })
    }

    /// Sends `submission` under the retry policy without ever sending it twice
    /// once it is on the ledger.
    ///
    /// Returns `Ok(None)` when a failed attempt turns out to have landed.
    async fn submit_guarded(
        &self,
        match_id: MatchId,
        submission: Submission,
    ) -> std::result::Result<Option<Receipt>, LedgerError> {
        let operation = submission.operation();
        let sent = AtomicBool::new(false);
        let sent = &sent;

        let submitted = with_retry(&self.retry, operation, move || async move {
            if sent.swap(true, Ordering::SeqCst) && self.is_on_ledger(match_id, submission).await {
                info!(target: "runtime::submission", %match_id, operation, "Earlier attempt landed, not resending");
                return Ok(None);
            }
            self.send(match_id, submission).await.map(Some)
        })
        .await;

        let error = match submitted {
            Ok(receipt) => return Ok(receipt),
            Err(error) => error,
        };
        if self.is_on_ledger(match_id, submission).await {
            info!(target: "runtime::submission", %match_id, operation, %error, "Submission found on ledger despite error");
            return Ok(None);
        }
        Err(error)
    }

    async fn send(&self, match_id: MatchId, submission: Submission) -> std::result::Result<Receipt, LedgerError> {
        match submission {
            Submission::Commit { commit, .. } => self.gateway.submit_commit(match_id, commit).await,
            Submission::Reveal { mv, .. } => {
                self.gateway.submit_reveal(match_id, mv, COMMIT_SECRET).await
            }
            Submission::Open { mv, .. } => self.gateway.submit_open_move(match_id, mv).await,
        }
    }

    async fn is_on_ledger(&self, match_id: MatchId, submission: Submission) -> bool {
        match self.gateway.get_match(match_id).await {
            Ok(current) => submission.is_reflected_in(&current),
            Err(error) => {
                warn!(target: "runtime::submission", %match_id, %error, "Could not verify submission");
                false
            }
        }
    }

    /// Reveals the committed move for the snapshot's round.
    pub async fn reveal(&self, snapshot: &Match) -> Result<SubmitOutcome> {
        let seat = self.seat(snapshot)?;
        let (match_id, round) = (snapshot.id, snapshot.round);

        if matches!(
            self.state(),
            SubmissionState::Revealed { match_id: m, round: r } if m == match_id && r == round
        ) {
            return Ok(SubmitOutcome::AlreadyDone);
        }
        if snapshot.is_over() || snapshot.pending_move(seat).is_revealed() {
            return Ok(SubmitOutcome::AlreadyDone);
        }

        let pending = self.load_pending(match_id)?;

        if snapshot.phase != Phase::Reveal {
            if let Some(stale) = pending.filter(|p| p.round < round) {
                // The round we committed for has already resolved.
                debug!(target: "runtime::submission", %match_id, stale_round = stale.round, "Dropping resolved PendingCommit");
                self.discard_pending(match_id);
                self.transition(SubmissionState::Idle);
                return Ok(SubmitOutcome::AlreadyDone);
            }
            return Err(RuntimeError::NotYet {
                match_id,
                action: "reveal",
            });
        }

        let Some(pending) = pending.filter(|p| p.is_for(match_id, round)) else {
            warn!(target: "runtime::submission", %match_id, round, "Reveal due but no PendingCommit");
            return Err(RuntimeError::LostCommit { match_id, round });
        };
        if pending.commitment() != snapshot.pending_move(seat).commit {
            warn!(target: "runtime::submission", %match_id, round, "PendingCommit does not open the ledger commitment");
            return Err(RuntimeError::LostCommit { match_id, round });
        }

        if let SubmissionState::Committed {
            persisted: false, ..
        } = self.state()
            && let Err(error) = self.store.save(self.participant, &pending)
        {
            warn!(target: "runtime::submission", %match_id, round, %error, "Retrying PendingCommit save failed");
        }

        let previous = self.transition(SubmissionState::Revealing);
        let mv = pending.mv;

        let receipt = match self
            .submit_guarded(match_id, Submission::Reveal { seat, round, mv })
            .await
        {
            Ok(receipt) => receipt,
            Err(error) => {
                self.transition(previous);
                return Err(error.into());
            }
        };

        self.discard_pending(match_id);
        self.transition(SubmissionState::Revealed { match_id, round });
        info!(target: "runtime::submission", %match_id, round, %mv, "Move revealed");

        Ok(SubmitOutcome::Revealed {
            match_id,
            round,
            mv,
            receipt,
        })
    }

    /// Plays `mv` in the clear for reveal-only matches.
    async fn play_open(&self, snapshot: &Match, mv: MoveRef) -> Result<SubmitOutcome> {
        let seat = self.seat(snapshot)?;
        let (match_id, round) = (snapshot.id, snapshot.round);

        if snapshot.is_over() || snapshot.pending_move(seat).is_revealed() {
            return Ok(SubmitOutcome::AlreadyDone);
        }

        let previous = self.transition(SubmissionState::Revealing);
        let receipt = match self
            .submit_guarded(match_id, Submission::Open { seat, round, mv })
            .await
        {
            Ok(receipt) => receipt,
            Err(error) => {
                self.transition(previous);
                return Err(error.into());
            }
        };

        self.transition(SubmissionState::Revealed { match_id, round });
        info!(target: "runtime::submission", %match_id, round, %mv, "Open move played");

        Ok(SubmitOutcome::Revealed {
            match_id,
            round,
            mv,
            receipt,
        })
    }

    /// Withdraws from the match and drops its PendingCommit.
    ///
    /// Returns `None` when the ledger reports we had already left.
    pub async fn exit(&self, match_id: MatchId) -> Result<Option<Receipt>> {
        let receipt = match with_retry(&self.retry, "withdraw", || self.gateway.withdraw(match_id)).await {
            Ok(receipt) => Some(receipt),
            Err(error) if is_reason(&error, &RejectionReason::NotYourMatch) => {
                debug!(target: "runtime::submission", %match_id, "Already withdrawn");
                None
            }
            Err(error) => return Err(error.into()),
        };

        self.discard_pending(match_id);
        self.transition(SubmissionState::Idle);
        info!(target: "runtime::submission", %match_id, "Withdrew from match");

        Ok(receipt)
    }

    /// PendingCommit for `match_id`, preferring the in-memory copy.
    fn load_pending(&self, match_id: MatchId) -> Result<Option<PendingCommit>> {
        if let SubmissionState::Committed { pending, .. } = self.state()
            && pending.match_id == match_id
        {
            return Ok(Some(pending));
        }
        Ok(self
            .store
            .load(self.participant)?
            .filter(|pending| pending.match_id == match_id))
    }

    fn discard_pending(&self, match_id: MatchId) {
        let stored = match self.store.load(self.participant) {
            Ok(stored) => stored,
            Err(error) => {
                warn!(target: "runtime::submission", %match_id, %error, "Could not read PendingCommit store");
                return;
            }
        };
        if stored.is_some_and(|pending| pending.match_id == match_id)
            && let Err(error) = self.store.clear(self.participant)
        {
            warn!(target: "runtime::submission", %match_id, %error, "Could not clear PendingCommit");
        }
    }
}

fn is_reason(error: &LedgerError, reason: &RejectionReason) -> bool {
    error.rejection().is_some_and(|rejection| &rejection.reason == reason)
}

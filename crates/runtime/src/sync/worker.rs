//! Turn synchronizer actor.
//!
//! One actor per active match owns the [`MatchStateCache`]. Ticks, pushed
//! protocol events and manual triggers all start the same observation;
//! ledger calls run in spawned tasks and their completions are applied back
//! on the actor, so cache mutation never races.

use std::sync::Arc;

use battle_core::{Address, DecodedEvent, Match, MatchId, Phase};
use client_ledger_core::{LedgerError, LedgerGateway, Receipt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, trace, warn};

use super::{SingleFlight, SyncState, derive_state, exit_reason};
use crate::api::{Disposition, MoveProvider, MoveRequest, Result, RuntimeError, SyncHandle};
use crate::cache::{ExitState, MatchStateCache};
use crate::config::{Clock, ProtocolMode, SyncConfig};
use crate::events::{Event, EventBus, ExitReason, LifecycleEvent, TurnEvent};
use crate::repository::PendingCommit;
use crate::submission::{MoveSubmitter, SubmitOutcome};

/// Commands accepted by the synchronizer.
pub(crate) enum Command {
    Trigger,
    Snapshot {
        reply: oneshot::Sender<SyncSnapshot>,
    },
    State {
        reply: oneshot::Sender<SyncState>,
    },
    /// Replies once nothing is in flight.
    Settle {
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Read-only view of the synchronizer.
#[derive(Debug, Clone)]
pub struct SyncSnapshot {
    pub match_id: MatchId,
    pub record: Option<Match>,
    pub state: SyncState,
    pub pending: Option<PendingCommit>,
    pub exit: ExitState,
    pub log_cursor: u64,
    pub in_flight: bool,
}

/// Collaborators of one synchronizer.
#[derive(Clone)]
pub struct SyncContext {
    pub match_id: MatchId,
    pub gateway: Arc<dyn LedgerGateway>,
    pub submitter: Arc<MoveSubmitter>,
    pub provider: Arc<dyn MoveProvider>,
    pub bus: EventBus,
    pub clock: Arc<dyn Clock>,
    pub config: SyncConfig,
}

impl SyncContext {
    /// Starts the actor. `push` optionally feeds protocol events as triggers.
    pub fn spawn(
        self,
        push: Option<mpsc::Receiver<DecodedEvent>>,
    ) -> (SyncHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(self.config.command_buffer.max(1));
        let handle = SyncHandle::new(command_tx, self.bus.clone());
        let worker = TurnSynchronizer::new(self, command_rx, push);
        (handle, tokio::spawn(worker.run()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    /// Commit, or open move in reveal-only mode.
    Play,
    Reveal,
}

struct Observation {
    record: Match,
    events: Vec<DecodedEvent>,
    next_offset: u64,
}

enum Completion {
    Observed {
        match_id: MatchId,
        result: Result<Observation>,
    },
    Acted {
        match_id: MatchId,
        action: Action,
        result: Result<SubmitOutcome>,
    },
    Exited {
        match_id: MatchId,
        reason: ExitReason,
        result: Result<Option<Receipt>>,
    },
}

struct TurnSynchronizer {
    ctx: SyncContext,
    participant: Address,
    cache: MatchStateCache,
    state: SyncState,
    flights: SingleFlight<MatchId>,
    tasks: JoinSet<Completion>,
    command_rx: mpsc::Receiver<Command>,
    push_rx: Option<mpsc::Receiver<DecodedEvent>>,
    settle_waiters: Vec<oneshot::Sender<()>>,
    halted: bool,
}

impl TurnSynchronizer {
    fn new(
        ctx: SyncContext,
        command_rx: mpsc::Receiver<Command>,
        push_rx: Option<mpsc::Receiver<DecodedEvent>>,
    ) -> Self {
        let participant = ctx.submitter.participant();
        Self {
            ctx,
            participant,
            cache: MatchStateCache::new(),
            state: SyncState::NotInMatch,
            flights: SingleFlight::new(),
            tasks: JoinSet::new(),
            command_rx,
            push_rx,
            settle_waiters: Vec::new(),
            halted: false,
        }
    }

    async fn run(mut self) {
        let poll = self.ctx.config.poll_interval;
        let mut ticker = interval_at(Instant::now() + poll, poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            target: "runtime::sync",
            match_id = %self.ctx.match_id,
            participant = %self.participant,
            "Synchronizer started"
        );
        self.trigger("start");

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(command) => {
                        if !self.handle_command(command) {
                            break;
                        }
                    }
                    None => break,
                },
                Some(joined) = self.tasks.join_next() => {
                    match joined {
                        Ok(completion) => self.handle_completion(completion),
                        Err(join_error) => {
                            error!(target: "runtime::sync", %join_error, "Synchronizer task failed");
                            self.flights.finish(&self.ctx.match_id);
                        }
                    }
                    self.notify_settled();
                }
                _ = ticker.tick() => self.trigger("tick"),
                pushed = next_push(&mut self.push_rx) => match pushed {
                    Some(event) => {
                        trace!(target: "runtime::sync", id = event.id, name = event.name(), "Protocol event pushed");
                        self.trigger("push");
                    }
                    None => {
                        debug!(target: "runtime::sync", "Push stream closed, polling only");
                        self.push_rx = None;
                    }
                },
            }
        }

        // In-flight calls finish on their own; their results are dropped.
        self.tasks.detach_all();
        for waiter in self.settle_waiters.drain(..) {
            let _ = waiter.send(());
        }
        info!(target: "runtime::sync", match_id = %self.ctx.match_id, "Synchronizer stopped");
    }

    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Trigger => self.trigger("manual"),
            Command::Snapshot { reply } => {
                if reply.send(self.snapshot()).is_err() {
                    debug!(target: "runtime::sync", "Snapshot reply channel closed (caller dropped)");
                }
            }
            Command::State { reply } => {
                if reply.send(self.state).is_err() {
                    debug!(target: "runtime::sync", "State reply channel closed (caller dropped)");
                }
            }
            Command::Settle { reply } => {
                self.settle_waiters.push(reply);
                self.notify_settled();
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    fn is_idle(&self) -> bool {
        self.tasks.is_empty() && self.flights.is_idle()
    }

    fn notify_settled(&mut self) {
        if self.is_idle() {
            for waiter in self.settle_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }

    fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            match_id: self.ctx.match_id,
            record: self.cache.current().cloned(),
            state: self.state,
            pending: self.cache.pending().copied(),
            exit: self.cache.exit_state(),
            log_cursor: self.cache.log_cursor(),
            in_flight: !self.is_idle(),
        }
    }

    /// Starts an observation unless one is already running for the match.
    fn trigger(&mut self, source: &'static str) {
        let match_id = self.ctx.match_id;

        if self.halted || self.cache.exit_state() != ExitState::NotStarted {
            trace!(target: "runtime::sync", %match_id, source, "Trigger ignored");
            return;
        }
        if !self.flights.try_begin(match_id) {
            debug!(target: "runtime::sync", %match_id, source, "Trigger dropped, operation in flight");
            return;
        }

        let gateway = Arc::clone(&self.ctx.gateway);
        let cursor = self.cache.log_cursor();
        self.tasks.spawn(async move {
            let result = observe(gateway.as_ref(), match_id, cursor).await;
            Completion::Observed { match_id, result }
        });
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Observed { match_id, result } => {
                self.flights.finish(&match_id);
                self.on_observed(match_id, result);
            }
            Completion::Acted {
                match_id,
                action,
                result,
            } => {
                self.flights.finish(&match_id);
                self.on_acted(match_id, action, result);
            }
            Completion::Exited {
                match_id,
                reason,
                result,
            } => {
                self.flights.finish(&match_id);
                self.on_exited(match_id, reason, result);
            }
        }
    }

    fn on_observed(&mut self, match_id: MatchId, result: Result<Observation>) {
        if self.cache.exit_state() == ExitState::Done {
            return;
        }

        let observation = match result {
            Ok(observation) => observation,
            Err(RuntimeError::Ledger(LedgerError::MatchNotFound(_))) => {
                self.finish_without_exit(match_id, ExitReason::NotSeated);
                return;
            }
            Err(error) => {
                warn!(target: "runtime::sync", %match_id, %error, "Refresh failed, waiting for next trigger");
                return;
            }
        };

        for event in self
            .cache
            .advance_log(observation.events, observation.next_offset)
        {
            self.ctx.bus.publish(Event::ledger(event));
        }

        let accepted = self.cache.refresh(observation.record);
        let now = self.ctx.clock.now_secs();
        let state = derive_state(
            self.cache.current(),
            self.participant,
            self.ctx.config.protocol,
            now,
            self.ctx.config.abandon_margin_secs,
        );
        self.set_state(match_id, state);

        if accepted {
            self.act(match_id, state);
        }
    }

    fn act(&mut self, match_id: MatchId, state: SyncState) {
        let Some(record) = self.cache.current().cloned() else {
            return;
        };
        let protocol = self.ctx.config.protocol;

        match state {
            SyncState::MatchOver => self.start_exit(match_id, exit_reason(&record)),
            SyncState::NotInMatch => self.finish_without_exit(match_id, ExitReason::NotSeated),
            SyncState::MyTurnPending
                if protocol == ProtocolMode::RevealOnly || record.phase == Phase::Commit =>
            {
                if self.cache.observed_round_advance() {
                    self.spawn_play(record);
                } else {
                    trace!(target: "runtime::sync", %match_id, round = record.round, "Round already handled");
                }
            }
            SyncState::MyTurnPending => self.spawn_reveal(record),
            SyncState::AwaitingOpponent
            | SyncState::WaitingOnOpponentCommit
            | SyncState::WaitingOnOpponentReveal => {}
        }
    }

    fn spawn_play(&mut self, record: Match) {
        let match_id = record.id;
        let Some(seat) = record.seat_of(self.participant) else {
            return;
        };
        if !self.flights.try_begin(match_id) {
            self.cache.rearm_round_advance();
            return;
        }

        self.ctx.bus.publish(Event::Turn(TurnEvent::MoveRequested {
            match_id,
            round: record.round,
        }));

        let provider = Arc::clone(&self.ctx.provider);
        let submitter = Arc::clone(&self.ctx.submitter);
        let protocol = self.ctx.config.protocol;
        self.tasks.spawn(async move {
            let result: Result<SubmitOutcome> = async {
                let request = MoveRequest::new(record.clone(), seat);
                let mv = provider.select_move(&request).await?;
                submitter.play(&record, mv, protocol).await
            }
            .await;
            Completion::Acted {
                match_id,
                action: Action::Play,
                result,
            }
        });
    }

    fn spawn_reveal(&mut self, record: Match) {
        let match_id = record.id;
        if !self.flights.try_begin(match_id) {
            return;
        }

        let submitter = Arc::clone(&self.ctx.submitter);
        self.tasks.spawn(async move {
            let result = submitter.reveal(&record).await;
            Completion::Acted {
                match_id,
                action: Action::Reveal,
                result,
            }
        });
    }

    fn on_acted(&mut self, match_id: MatchId, action: Action, result: Result<SubmitOutcome>) {
        if self.cache.exit_state() == ExitState::Done {
            debug!(target: "runtime::sync", %match_id, ?action, "Ignoring completion after exit");
            return;
        }

        let error = match result {
            Ok(outcome) => {
                self.apply_outcome(outcome);
                if outcome != SubmitOutcome::AlreadyDone {
                    self.trigger("submitted");
                }
                return;
            }
            Err(error) => error,
        };

        if matches!(error, RuntimeError::ProviderClosed) {
            self.halt(match_id, "move provider closed");
            return;
        }

        let now = self.ctx.clock.now_secs();
        let deadline_passed = self
            .cache
            .current()
            .is_some_and(|record| record.deadline_passed(now));

        match error.disposition(deadline_passed) {
            Disposition::Retry | Disposition::NotYet => {
                debug!(target: "runtime::sync", %match_id, ?action, %error, "Action deferred to next trigger");
                if action == Action::Play {
                    self.cache.rearm_round_advance();
                }
            }
            Disposition::Terminal => {
                let reason = match error {
                    RuntimeError::LostCommit { .. } => ExitReason::LostCommit,
                    RuntimeError::NotSeated(_) => ExitReason::NotSeated,
                    _ => ExitReason::Rejected,
                };
                warn!(target: "runtime::sync", %match_id, ?action, %error, "Action failed terminally, exiting match");
                self.start_exit(match_id, reason);
            }
        }
    }

    fn apply_outcome(&mut self, outcome: SubmitOutcome) {
        match outcome {
            SubmitOutcome::Committed {
                pending, persisted, ..
            } => {
                self.cache.set_pending(Some(pending));
                self.ctx.bus.publish(Event::Turn(TurnEvent::MoveCommitted {
                    match_id: pending.match_id,
                    round: pending.round,
                    mv: pending.mv,
                    persisted,
                }));
            }
            SubmitOutcome::Revealed {
                match_id, round, mv, ..
            } => {
                self.cache.set_pending(None);
                self.ctx.bus.publish(Event::Turn(TurnEvent::MoveRevealed {
                    match_id,
                    round,
                    mv,
                }));
            }
            SubmitOutcome::AlreadyDone => {}
        }
    }

    /// Withdraws from the match, at most once at a time.
    fn start_exit(&mut self, match_id: MatchId, reason: ExitReason) {
        if !self.cache.begin_exit() {
            return;
        }
        if !self.flights.try_begin(match_id) {
            self.cache.abort_exit();
            return;
        }

        info!(target: "runtime::sync", %match_id, ?reason, "Exiting match");
        self.ctx
            .bus
            .publish(Event::Lifecycle(LifecycleEvent::ExitStarted { match_id, reason }));

        let submitter = Arc::clone(&self.ctx.submitter);
        self.tasks.spawn(async move {
            let result = submitter.exit(match_id).await;
            Completion::Exited {
                match_id,
                reason,
                result,
            }
        });
    }

    fn on_exited(&mut self, match_id: MatchId, reason: ExitReason, result: Result<Option<Receipt>>) {
        match result {
            Ok(receipt) => {
                self.cache.finish_exit();
                info!(
                    target: "runtime::sync",
                    %match_id,
                    ?reason,
                    tx = ?receipt.map(|r| r.tx_hash),
                    "Exited match"
                );
                self.ctx
                    .bus
                    .publish(Event::Lifecycle(LifecycleEvent::Exited { match_id, reason }));
            }
            Err(error) => {
                self.cache.abort_exit();
                warn!(target: "runtime::sync", %match_id, ?reason, %error, "Withdraw failed, will retry");
                self.ctx
                    .bus
                    .publish(Event::Lifecycle(LifecycleEvent::ExitFailed {
                        match_id,
                        reason,
                        error: error.to_string(),
                    }));
            }
        }
    }

    /// Marks the match done without a withdraw (nothing to leave).
    fn finish_without_exit(&mut self, match_id: MatchId, reason: ExitReason) {
        if !self.cache.begin_exit() {
            return;
        }
        self.cache.finish_exit();
        info!(target: "runtime::sync", %match_id, ?reason, "Match left without withdraw");
        self.ctx
            .bus
            .publish(Event::Lifecycle(LifecycleEvent::Exited { match_id, reason }));
    }

    fn halt(&mut self, match_id: MatchId, reason: &str) {
        self.halted = true;
        warn!(target: "runtime::sync", %match_id, reason, "Synchronizer halted");
        self.ctx.bus.publish(Event::Lifecycle(LifecycleEvent::Halted {
            match_id,
            reason: reason.to_string(),
        }));
    }

    fn set_state(&mut self, match_id: MatchId, state: SyncState) {
        if self.state == state {
            return;
        }
        debug!(target: "runtime::sync", %match_id, from = ?self.state, to = ?state, "State changed");
        self.state = state;
        self.ctx
            .bus
            .publish(Event::Turn(TurnEvent::StateChanged { match_id, state }));
    }
}

/// Reads the match and any new log pages. Log failures only delay events.
async fn observe(gateway: &dyn LedgerGateway, match_id: MatchId, cursor: u64) -> Result<Observation> {
    let record = gateway.get_match(match_id).await?;

    let (events, next_offset) = match gateway.read_log_from(match_id, cursor).await {
        Ok(page) => page,
        Err(error) => {
            warn!(target: "runtime::sync", %match_id, cursor, %error, "Event log read failed");
            (Vec::new(), cursor)
        }
    };

    Ok(Observation {
        record,
        events,
        next_offset,
    })
}

async fn next_push(push: &mut Option<mpsc::Receiver<DecodedEvent>>) -> Option<DecodedEvent> {
    match push {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

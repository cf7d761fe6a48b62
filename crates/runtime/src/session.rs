//! Participant session: acquire a match, play it to the end, repeat.
//!
//! A session resumes any match the ledger already seats us in before asking
//! its acquisition strategy for a new one, so a restarted client picks up
//! where it crashed.
use std::sync::Arc;

use battle_core::MatchId;
use client_ledger_core::{LedgerGateway, ProtocolEventSource};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::acquisition::{AcquireStep, AcquisitionStrategy};
use crate::api::{MoveProvider, Result, RuntimeError};
use crate::config::{Clock, RetryPolicy, SessionConfig, SyncConfig, SystemClock};
use crate::events::{Event, EventBus, ExitReason, LifecycleEvent, Topic};
use crate::repository::PendingCommitRepository;
use crate::submission::MoveSubmitter;
use crate::sync::SyncContext;

/// How a played match ended for this session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchOutcome {
    Exited(ExitReason),
    Halted(String),
}

/// Result of one acquisition-and-play step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionStep {
    Played {
        match_id: MatchId,
        outcome: MatchOutcome,
    },
    Waiting,
    Idle,
}

pub struct ParticipantSession {
    gateway: Arc<dyn LedgerGateway>,
    push_source: Option<Arc<dyn ProtocolEventSource>>,
    strategy: Box<dyn AcquisitionStrategy>,
    provider: Arc<dyn MoveProvider>,
    store: Arc<dyn PendingCommitRepository>,
    submitter: Arc<MoveSubmitter>,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    sync_config: SyncConfig,
    config: SessionConfig,
}

impl ParticipantSession {
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        strategy: Box<dyn AcquisitionStrategy>,
        provider: Arc<dyn MoveProvider>,
        store: Arc<dyn PendingCommitRepository>,
    ) -> Self {
        let submitter = Arc::new(MoveSubmitter::new(
            Arc::clone(&gateway),
            Arc::clone(&store),
            RetryPolicy::default(),
        ));
        Self {
            gateway,
            push_source: None,
            strategy,
            provider,
            store,
            submitter,
            bus: EventBus::new(),
            clock: Arc::new(SystemClock),
            sync_config: SyncConfig::default(),
            config: SessionConfig::default(),
        }
    }

    pub fn with_push_source(mut self, source: Arc<dyn ProtocolEventSource>) -> Self {
        self.push_source = Some(source);
        self
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sync_config(mut self, config: SyncConfig) -> Self {
        self.sync_config = config;
        self
    }

    pub fn with_session_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.submitter = Arc::new(MoveSubmitter::new(
            Arc::clone(&self.gateway),
            Arc::clone(&self.store),
            retry,
        ));
        self
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Plays matches until `count` have ended.
    pub async fn run_matches(&self, count: usize) -> Result<Vec<(MatchId, MatchOutcome)>> {
        let mut played = Vec::with_capacity(count);
        while played.len() < count {
            match self.run_once().await {
                Ok(SessionStep::Played { match_id, outcome }) => played.push((match_id, outcome)),
                Ok(SessionStep::Waiting | SessionStep::Idle) => sleep(self.config.idle_interval).await,
                Err(error) => {
                    warn!(target: "runtime::session", %error, "Session step failed");
                    sleep(self.config.idle_interval).await;
                }
            }
        }
        Ok(played)
    }

    /// Plays matches forever. Errors are logged and the loop continues.
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.run_once().await {
                Ok(SessionStep::Played { match_id, outcome }) => {
                    info!(target: "runtime::session", %match_id, ?outcome, "Match finished");
                }
                Ok(SessionStep::Waiting | SessionStep::Idle) => sleep(self.config.idle_interval).await,
                Err(error) => {
                    warn!(target: "runtime::session", %error, "Session step failed");
                    sleep(self.config.idle_interval).await;
                }
            }
        }
    }

    /// Resumes the current match, or takes one acquisition step.
    pub async fn run_once(&self) -> Result<SessionStep> {
        let me = self.gateway.participant();

        let match_id = match self.gateway.get_match_by_participant(me).await? {
            Some(record) => {
                info!(target: "runtime::session", match_id = %record.id, round = record.round, "Resuming match");
                record.id
            }
            None => match self.strategy.step(self.gateway.as_ref()).await? {
                AcquireStep::Matched(match_id) => match_id,
                AcquireStep::Waiting => return Ok(SessionStep::Waiting),
                AcquireStep::Idle => return Ok(SessionStep::Idle),
            },
        };

        let outcome = self.play_match(match_id).await?;
        Ok(SessionStep::Played { match_id, outcome })
    }

    /// Runs a synchronizer for `match_id` until it exits or halts.
    pub async fn play_match(&self, match_id: MatchId) -> Result<MatchOutcome> {
        // Subscribe before spawning so the terminal event cannot be missed.
        let mut lifecycle = self.bus.subscribe(Topic::Lifecycle);

        let push = match &self.push_source {
            Some(source) => match source.subscribe(match_id).await {
                Ok(rx) => Some(rx),
                Err(error) => {
                    warn!(target: "runtime::session", %match_id, %error, "Push subscription failed, polling only");
                    None
                }
            },
            None => None,
        };

        let context = SyncContext {
            match_id,
            gateway: Arc::clone(&self.gateway),
            submitter: Arc::clone(&self.submitter),
            provider: Arc::clone(&self.provider),
            bus: self.bus.clone(),
            clock: Arc::clone(&self.clock),
            config: self.sync_config.clone(),
        };
        let (handle, worker) = context.spawn(push);

        let outcome = loop {
            match lifecycle.recv().await {
                Ok(Event::Lifecycle(LifecycleEvent::Exited { match_id: id, reason })) if id == match_id => {
                    break MatchOutcome::Exited(reason);
                }
                Ok(Event::Lifecycle(LifecycleEvent::Halted { match_id: id, reason })) if id == match_id => {
                    break MatchOutcome::Halted(reason);
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(target: "runtime::session", %match_id, skipped, "Lifecycle receiver lagged");
                }
                Err(RecvError::Closed) => break MatchOutcome::Halted("event bus closed".to_string()),
            }
        };

        if let Err(error) = handle.shutdown().await {
            warn!(target: "runtime::session", %match_id, %error, "Synchronizer already stopped");
        }
        worker.await.map_err(RuntimeError::WorkerJoin)?;

        Ok(outcome)
    }
}

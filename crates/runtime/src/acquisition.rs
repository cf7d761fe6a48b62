//! Match acquisition strategies.
//!
//! A strategy takes one step toward a match per call and reports whether it
//! produced a match id, is waiting on the ledger, or had nothing to do.
//! Strategies never play; the session hands matched ids to a synchronizer.
use async_trait::async_trait;
use battle_core::{Address, ChallengeMode, GameMode, MatchId};
use client_ledger_core::LedgerGateway;
use tracing::{debug, info};

use crate::api::Result;
use crate::config::{SessionConfig, TeamSelection};

/// Outcome of a single acquisition step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireStep {
    Matched(MatchId),
    /// Queued or challenged; the ledger has not paired us yet.
    Waiting,
    /// Nothing to do this round.
    Idle,
}

#[async_trait]
pub trait AcquisitionStrategy: Send + Sync {
    async fn step(&self, gateway: &dyn LedgerGateway) -> Result<AcquireStep>;
}

/// Returns the participant's current match, if the ledger has seated us.
async fn current_match(gateway: &dyn LedgerGateway) -> Result<Option<MatchId>> {
    let me = gateway.participant();
    Ok(gateway
        .get_match_by_participant(me)
        .await?
        .map(|record| record.id))
}

/// Shared first-come queue.
#[derive(Clone, Debug)]
pub struct QueueStrategy {
    pub mode: GameMode,
    pub team: TeamSelection,
    /// Stay queued while nobody else is waiting.
    pub wait_in_queue: bool,
    /// Only join when another participant is already queued.
    pub require_waiting_opponent: bool,
}

impl QueueStrategy {
    pub fn new(mode: GameMode, team: TeamSelection) -> Self {
        Self {
            mode,
            team,
            wait_in_queue: false,
            require_waiting_opponent: true,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            mode: config.mode,
            team: config.team,
            wait_in_queue: config.wait_in_queue,
            require_waiting_opponent: !config.wait_in_queue,
        }
    }
}

#[async_trait]
impl AcquisitionStrategy for QueueStrategy {
    async fn step(&self, gateway: &dyn LedgerGateway) -> Result<AcquireStep> {
        let me = gateway.participant();
        let mode = self.mode;

        match gateway.queued_participant(mode).await? {
            Some(queued) if queued == me => {
                if self.wait_in_queue {
                    debug!(target: "runtime::acquisition", %mode, "Still queued");
                    return Ok(AcquireStep::Waiting);
                }
                info!(target: "runtime::acquisition", %mode, "Leaving queue");
                gateway.leave_queue(mode).await?;
                return Ok(AcquireStep::Idle);
            }
            None if self.require_waiting_opponent => {
                debug!(target: "runtime::acquisition", %mode, "Queue empty, skipping");
                return Ok(AcquireStep::Idle);
            }
            _ => {}
        }

        let team = self.team.pick();
        info!(target: "runtime::acquisition", %mode, units = ?team.units, "Joining queue");
        gateway.join_queue(mode, team).await?;

        Ok(match current_match(gateway).await? {
            Some(match_id) => AcquireStep::Matched(match_id),
            None => AcquireStep::Waiting,
        })
    }
}

/// Direct challenge to a named opponent.
#[derive(Clone, Debug)]
pub struct ChallengeStrategy {
    pub mode: GameMode,
    pub team: TeamSelection,
    pub opponent: Address,
}

impl ChallengeStrategy {
    pub fn new(mode: GameMode, team: TeamSelection, opponent: Address) -> Self {
        Self {
            mode,
            team,
            opponent,
        }
    }

    /// Rejects our own pending challenges to the opponent.
    pub async fn withdraw(&self, gateway: &dyn LedgerGateway) -> Result<usize> {
        let me = gateway.participant();
        let outgoing: Vec<_> = gateway
            .list_challenges(me, self.mode)
            .await?
            .into_iter()
            .filter(|c| c.is_outgoing_for(me) && c.opponent == self.opponent)
            .collect();

        for challenge in &outgoing {
            gateway.reject_challenge(challenge.id).await?;
        }
        Ok(outgoing.len())
    }
}

#[async_trait]
impl AcquisitionStrategy for ChallengeStrategy {
    async fn step(&self, gateway: &dyn LedgerGateway) -> Result<AcquireStep> {
        if let Some(match_id) = current_match(gateway).await? {
            return Ok(AcquireStep::Matched(match_id));
        }

        let me = gateway.participant();
        let pending = gateway
            .list_challenges(me, self.mode)
            .await?
            .into_iter()
            .any(|c| c.is_outgoing_for(me) && c.opponent == self.opponent);
        if pending {
            return Ok(AcquireStep::Waiting);
        }

        info!(target: "runtime::acquisition", mode = %self.mode, opponent = %self.opponent, "Issuing challenge");
        gateway
            .challenge(self.mode, self.team.pick(), self.opponent)
            .await?;
        Ok(AcquireStep::Waiting)
    }
}

/// What to do with incoming challenges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RespondPolicy {
    AcceptFirst,
    RejectAll,
}

/// Answers challenges addressed to us.
#[derive(Clone, Debug)]
pub struct RespondStrategy {
    pub mode: GameMode,
    pub team: TeamSelection,
    pub policy: RespondPolicy,
}

impl RespondStrategy {
    pub fn new(mode: GameMode, team: TeamSelection, policy: RespondPolicy) -> Self {
        Self { mode, team, policy }
    }
}

#[async_trait]
impl AcquisitionStrategy for RespondStrategy {
    async fn step(&self, gateway: &dyn LedgerGateway) -> Result<AcquireStep> {
        let me = gateway.participant();
        let incoming: Vec<_> = gateway
            .list_challenges(me, self.mode)
            .await?
            .into_iter()
            .filter(|c| c.is_incoming_for(me))
            .collect();

        match self.policy {
            RespondPolicy::AcceptFirst => {
                let Some(challenge) = incoming.first() else {
                    return Ok(AcquireStep::Idle);
                };
                info!(target: "runtime::acquisition", id = %challenge.id, from = %challenge.challenger, "Accepting challenge");
                let match_id = gateway
                    .accept_challenge(challenge.id, self.team.pick())
                    .await?;
                Ok(AcquireStep::Matched(match_id))
            }
            RespondPolicy::RejectAll => {
                for challenge in &incoming {
                    info!(target: "runtime::acquisition", id = %challenge.id, from = %challenge.challenger, "Rejecting challenge");
                    gateway.reject_challenge(challenge.id).await?;
                }
                Ok(AcquireStep::Idle)
            }
        }
    }
}

/// Answers challenges first, then falls back to the queue.
#[derive(Clone, Debug)]
pub struct HybridStrategy {
    pub respond: RespondStrategy,
    pub queue: QueueStrategy,
}

#[async_trait]
impl AcquisitionStrategy for HybridStrategy {
    async fn step(&self, gateway: &dyn LedgerGateway) -> Result<AcquireStep> {
        match self.respond.step(gateway).await? {
            AcquireStep::Matched(match_id) => Ok(AcquireStep::Matched(match_id)),
            AcquireStep::Waiting | AcquireStep::Idle => self.queue.step(gateway).await,
        }
    }
}

/// Default strategy for how a mode pairs participants.
pub fn for_mode(challenge_mode: ChallengeMode, config: &SessionConfig) -> Box<dyn AcquisitionStrategy> {
    let respond = RespondStrategy::new(config.mode, config.team, RespondPolicy::AcceptFirst);
    match challenge_mode {
        ChallengeMode::Queue => Box::new(QueueStrategy::from_config(config)),
        ChallengeMode::OnlyChallenge => Box::new(respond),
        ChallengeMode::QueueAndChallenge => Box::new(HybridStrategy {
            respond,
            queue: QueueStrategy::from_config(config),
        }),
    }
}

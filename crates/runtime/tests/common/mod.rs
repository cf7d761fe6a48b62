//! Shared fixtures for synchronizer integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use battle_core::{Address, GameMode, MatchId, MoveRef, Team};
use client_ledger_core::{
    MatchQueries, Matchmaking, MockClient, MockLedger, ProtocolEventSource,
};
use runtime::{
    Clock, Event, EventBus, ExitReason, InMemoryPendingCommitRepository, LifecycleEvent, MoveProvider,
    MoveSubmitter, PendingCommitRepository, RetryPolicy, SyncConfig, SyncContext, SyncHandle,
    SystemClock, Topic, TurnEvent,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::timeout;

pub const ALICE: Address = Address::repeat_byte(0xa1);
pub const BOB: Address = Address::repeat_byte(0xb0);
pub const MODE: GameMode = GameMode(2);

const WAIT: Duration = Duration::from_secs(5);

pub fn mv(byte: u8) -> MoveRef {
    MoveRef(Address::repeat_byte(byte))
}

/// Polls fast enough that tests never wait on a manual trigger.
pub fn polling() -> SyncConfig {
    SyncConfig {
        poll_interval: Duration::from_millis(10),
        ..SyncConfig::default()
    }
}

/// Polls so rarely that only the start trigger and manual triggers run.
pub fn manual() -> SyncConfig {
    SyncConfig {
        poll_interval: Duration::from_secs(3_600),
        ..SyncConfig::default()
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5))
}

pub fn memory_store() -> Arc<dyn PendingCommitRepository> {
    Arc::new(InMemoryPendingCommitRepository::new())
}

/// Queues ALICE then BOB, so ALICE holds the challenger seat.
pub async fn paired(ledger: &MockLedger) -> MatchId {
    let alice = ledger.client(ALICE);
    alice.join_queue(MODE, Team::new(1, 2)).await.unwrap();
    ledger.client(BOB).join_queue(MODE, Team::new(3, 4)).await.unwrap();
    alice
        .get_match_by_participant(ALICE)
        .await
        .unwrap()
        .expect("queue pairs the two participants")
        .id
}

/// A running synchronizer plus receivers subscribed before it started.
pub struct Player {
    pub client: MockClient,
    pub submitter: Arc<MoveSubmitter>,
    pub handle: SyncHandle,
    pub worker: JoinHandle<()>,
    pub lifecycle: broadcast::Receiver<Event>,
    pub turns: broadcast::Receiver<Event>,
    pub battle: broadcast::Receiver<Event>,
}

pub struct PlayerSetup {
    pub participant: Address,
    pub provider: Arc<dyn MoveProvider>,
    pub store: Arc<dyn PendingCommitRepository>,
    pub config: SyncConfig,
    pub clock: Arc<dyn Clock>,
    pub push: bool,
}

impl PlayerSetup {
    pub fn new(participant: Address, provider: Arc<dyn MoveProvider>) -> Self {
        Self {
            participant,
            provider,
            store: memory_store(),
            config: polling(),
            clock: Arc::new(SystemClock),
            push: false,
        }
    }

    pub fn store(mut self, store: Arc<dyn PendingCommitRepository>) -> Self {
        self.store = store;
        self
    }

    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_push(mut self) -> Self {
        self.push = true;
        self
    }

    pub async fn spawn(self, ledger: &MockLedger, match_id: MatchId) -> Player {
        let client = ledger.client(self.participant);
        let gateway = Arc::new(client.clone());
        let submitter = Arc::new(MoveSubmitter::new(gateway.clone(), self.store, fast_retry()));

        let bus = EventBus::new();
        let lifecycle = bus.subscribe(Topic::Lifecycle);
        let turns = bus.subscribe(Topic::Turn);
        let battle = bus.subscribe(Topic::Battle);

        let push = if self.push {
            Some(client.subscribe(match_id).await.unwrap())
        } else {
            None
        };

        let context = SyncContext {
            match_id,
            gateway,
            submitter: Arc::clone(&submitter),
            provider: self.provider,
            bus,
            clock: self.clock,
            config: self.config,
        };
        let (handle, worker) = context.spawn(push);

        Player {
            client,
            submitter,
            handle,
            worker,
            lifecycle,
            turns,
            battle,
        }
    }
}

impl Player {
    /// Waits for the terminal lifecycle event of `match_id`.
    pub async fn exited(&mut self, match_id: MatchId) -> ExitReason {
        timeout(WAIT, async {
            loop {
                match self.lifecycle.recv().await {
                    Ok(Event::Lifecycle(LifecycleEvent::Exited { match_id: id, reason }))
                        if id == match_id =>
                    {
                        return reason;
                    }
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
                }
            }
        })
        .await
        .expect("synchronizer did not exit in time")
    }

    /// Waits for our reveal of `round` to be reported.
    pub async fn revealed(&mut self, round: u64) -> MoveRef {
        timeout(WAIT, async {
            loop {
                match self.turns.recv().await {
                    Ok(Event::Turn(TurnEvent::MoveRevealed { round: r, mv, .. })) if r == round => {
                        return mv;
                    }
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
                }
            }
        })
        .await
        .expect("reveal was not reported in time")
    }

    pub async fn settle(&self) {
        timeout(WAIT, self.handle.settle())
            .await
            .expect("synchronizer did not settle in time")
            .unwrap();
    }

    pub async fn stop(self) {
        self.handle.shutdown().await.unwrap();
        self.worker.await.unwrap();
    }
}

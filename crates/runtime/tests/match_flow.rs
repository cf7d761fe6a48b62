//! End-to-end match flows over the in-memory ledger.
//!
//! Each test runs real synchronizers (or whole sessions) for both seats of a
//! match and checks what ended up on the ledger.
mod common;

use std::sync::Arc;
use std::time::Duration;

use battle_core::{Match, MatchId, Phase};
use client_ledger_core::{MockLedger, MockOp};
use common::{ALICE, BOB, MODE, PlayerSetup, manual, mv, paired};
use runtime::{
    Event, ExitReason, InMemoryPendingCommitRepository, MatchOutcome, ParticipantSession,
    ProtocolMode, QueueStrategy, RetryPolicy, ScriptedMoveProvider, SessionConfig, SyncConfig,
    SyncState, TeamSelection,
};

/// Two participants play a two-round match to game over:
/// 1. Both commit, both reveal, the round resolves
/// 2. The round advance triggers the next commit
/// 3. Game over makes each side withdraw exactly once
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn two_synchronizers_play_to_game_over() {
    let ledger = MockLedger::new();
    ledger.set_rounds_to_finish(2);
    let match_id = paired(&ledger).await;

    let mut alice = PlayerSetup::new(ALICE, Arc::new(ScriptedMoveProvider::repeating(mv(1))))
        .spawn(&ledger, match_id)
        .await;
    let mut bob = PlayerSetup::new(BOB, Arc::new(ScriptedMoveProvider::repeating(mv(2))))
        .spawn(&ledger, match_id)
        .await;

    assert_eq!(alice.exited(match_id).await, ExitReason::GameOver);
    assert_eq!(bob.exited(match_id).await, ExitReason::GameOver);

    let record = ledger.match_record(match_id).unwrap();
    assert_eq!(record.phase, Phase::GameOver);
    assert_eq!(record.round, 2);
    assert_eq!(ledger.calls(MockOp::Commit), 4);
    assert_eq!(ledger.calls(MockOp::Reveal), 4);
    assert_eq!(ledger.calls(MockOp::Withdraw), 2);

    let snapshot = alice.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, SyncState::MatchOver);
    assert!(snapshot.pending.is_none());

    // Damage from both resolved rounds reached the battle topic.
    let mut damage = 0;
    while let Ok(event) = alice.battle.try_recv() {
        if let Event::Battle(event) = event
            && event.name() == "Damage"
        {
            damage += 1;
        }
    }
    assert_eq!(damage, 2);

    alice.stop().await;
    bob.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reveal_only_mode_skips_commits() {
    let ledger = MockLedger::new();
    ledger.set_reveal_only(MODE);
    ledger.set_rounds_to_finish(1);
    let match_id = paired(&ledger).await;

    let config = SyncConfig {
        protocol: ProtocolMode::RevealOnly,
        ..common::polling()
    };
    let mut alice = PlayerSetup::new(ALICE, Arc::new(ScriptedMoveProvider::repeating(mv(1))))
        .config(config.clone())
        .spawn(&ledger, match_id)
        .await;
    let mut bob = PlayerSetup::new(BOB, Arc::new(ScriptedMoveProvider::repeating(mv(2))))
        .config(config)
        .spawn(&ledger, match_id)
        .await;

    assert_eq!(alice.exited(match_id).await, ExitReason::GameOver);
    assert_eq!(bob.exited(match_id).await, ExitReason::GameOver);

    assert_eq!(ledger.calls(MockOp::Commit), 0);
    assert_eq!(ledger.calls(MockOp::Reveal), 0);
    assert_eq!(ledger.calls(MockOp::OpenMove), 2);

    alice.stop().await;
    bob.stop().await;
}

/// With polling effectively off, the opponent's commit arrives as a pushed
/// protocol event and is enough to drive our reveal.
#[tokio::test]
async fn pushed_protocol_event_triggers_reveal() {
    let ledger = MockLedger::new();
    let match_id = paired(&ledger).await;

    let mut alice = PlayerSetup::new(ALICE, Arc::new(ScriptedMoveProvider::new([mv(1)])))
        .config(manual())
        .with_push()
        .spawn(&ledger, match_id)
        .await;
    alice.settle().await;
    assert_eq!(
        alice.handle.state().await.unwrap(),
        SyncState::WaitingOnOpponentCommit
    );

    ledger.commit_as(match_id, BOB, mv(2));

    assert_eq!(alice.revealed(0).await, mv(1));
    let record = ledger.match_record(match_id).unwrap();
    assert_eq!(record.pending_moves[0].revealed, Some(mv(1)));

    alice.stop().await;
}

async fn wait_for(ledger: &MockLedger, match_id: MatchId, condition: impl Fn(&Match) -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !ledger.match_record(match_id).is_some_and(|record| condition(&record)) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("ledger did not reach the expected state");
}

/// A session given a push source plays a whole match with polling off: every
/// step after the first observation is driven by pushed events.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn session_with_push_source_plays_without_polling() {
    let ledger = MockLedger::new();
    ledger.set_rounds_to_finish(1);
    let match_id = paired(&ledger).await;

    let client = Arc::new(ledger.client(ALICE));
    let alice = ParticipantSession::new(
        client.clone(),
        Box::new(QueueStrategy::from_config(&session_config())),
        Arc::new(ScriptedMoveProvider::repeating(mv(1))),
        Arc::new(InMemoryPendingCommitRepository::new()),
    )
    .with_push_source(client)
    .with_sync_config(manual());

    let opponent = async {
        wait_for(&ledger, match_id, |m| m.pending_moves[0].is_committed()).await;
        ledger.commit_as(match_id, BOB, mv(2));
        wait_for(&ledger, match_id, |m| m.pending_moves[0].is_revealed()).await;
        ledger.reveal_as(match_id, BOB, mv(2));
    };

    let (outcome, ()) = tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(alice.play_match(match_id), opponent)
    })
    .await
    .expect("session did not finish on pushed events");

    assert_eq!(outcome.unwrap(), MatchOutcome::Exited(ExitReason::GameOver));
    assert_eq!(ledger.calls(MockOp::Reveal), 1);
    assert_eq!(ledger.calls(MockOp::Withdraw), 1);
}

fn session_config() -> SessionConfig {
    SessionConfig {
        mode: MODE,
        wait_in_queue: true,
        idle_interval: Duration::from_millis(10),
        team: TeamSelection::Random,
        ..SessionConfig::default()
    }
}

/// One session waits in the queue, the other joins when it sees a waiting
/// opponent; both play the match through and report the outcome.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sessions_pair_through_queue_and_finish() {
    let ledger = MockLedger::new();
    ledger.set_rounds_to_finish(1);

    let waiting = QueueStrategy::from_config(&session_config());
    let joining = QueueStrategy {
        wait_in_queue: false,
        require_waiting_opponent: true,
        ..waiting.clone()
    };

    let alice = ParticipantSession::new(
        Arc::new(ledger.client(ALICE)),
        Box::new(waiting),
        Arc::new(ScriptedMoveProvider::repeating(mv(1))),
        Arc::new(InMemoryPendingCommitRepository::new()),
    )
    .with_sync_config(common::polling())
    .with_session_config(session_config())
    .with_retry(RetryPolicy::none());

    let bob = ParticipantSession::new(
        Arc::new(ledger.client(BOB)),
        Box::new(joining),
        Arc::new(ScriptedMoveProvider::repeating(mv(2))),
        Arc::new(InMemoryPendingCommitRepository::new()),
    )
    .with_sync_config(common::polling())
    .with_session_config(session_config());

    // Alice queues first so Bob finds her waiting.
    let played = tokio::time::timeout(Duration::from_secs(5), async {
        let alice_run = alice.run_matches(1);
        let bob_run = async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            bob.run_matches(1).await
        };
        tokio::join!(alice_run, bob_run)
    })
    .await
    .expect("sessions did not finish in time");

    let (alice_played, bob_played) = (played.0.unwrap(), played.1.unwrap());
    assert_eq!(alice_played.len(), 1);
    assert_eq!(alice_played[0].1, MatchOutcome::Exited(ExitReason::GameOver));
    assert_eq!(bob_played[0], alice_played[0]);
    assert_eq!(ledger.calls(MockOp::Withdraw), 2);
}

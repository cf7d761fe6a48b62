//! Trigger coalescing and the per-round commit edge.
mod common;

use std::sync::Arc;

use client_ledger_core::{MockFault, MockLedger, MockOp};
use common::{ALICE, PlayerSetup, manual, mv, paired};
use runtime::{ScriptedMoveProvider, SyncState};

/// Triggers that arrive while an observation is in flight are dropped.
#[tokio::test]
async fn triggers_coalesce_while_observation_in_flight() {
    let ledger = MockLedger::new();
    let match_id = paired(&ledger).await;
    let gate = ledger.hold(MockOp::GetMatch);

    let alice = PlayerSetup::new(ALICE, Arc::new(ScriptedMoveProvider::repeating(mv(1))))
        .config(manual())
        .spawn(&ledger, match_id)
        .await;
    gate.entered().await;

    for _ in 0..5 {
        alice.handle.trigger().await.unwrap();
    }
    let snapshot = alice.handle.snapshot().await.unwrap();
    assert!(snapshot.in_flight);
    assert_eq!(ledger.calls(MockOp::GetMatch), 1);

    ledger.unhold(MockOp::GetMatch);
    gate.release(1);
    alice.settle().await;

    // Start observation, then the follow-up after the commit landed.
    assert_eq!(ledger.calls(MockOp::GetMatch), 2);
    assert_eq!(ledger.calls(MockOp::Commit), 1);

    alice.stop().await;
}

/// A commit is attempted once per observed round, not once per trigger.
#[tokio::test]
async fn commit_fires_once_per_round() {
    let ledger = MockLedger::new();
    let match_id = paired(&ledger).await;

    let alice = PlayerSetup::new(ALICE, Arc::new(ScriptedMoveProvider::repeating(mv(1))))
        .config(manual())
        .spawn(&ledger, match_id)
        .await;

    for _ in 0..4 {
        alice.handle.trigger().await.unwrap();
        alice.settle().await;
    }

    assert_eq!(ledger.calls(MockOp::Commit), 1);
    assert_eq!(
        alice.handle.state().await.unwrap(),
        SyncState::WaitingOnOpponentCommit
    );

    alice.stop().await;
}

/// A commit that fails transiently past the retry budget is attempted again
/// on the next trigger within the same round.
#[tokio::test]
async fn transient_commit_failure_rearms_the_round() {
    let ledger = MockLedger::new();
    let match_id = paired(&ledger).await;
    for _ in 0..3 {
        ledger.fail_next(MockOp::Commit, MockFault::Transport);
    }

    let alice = PlayerSetup::new(ALICE, Arc::new(ScriptedMoveProvider::repeating(mv(1))))
        .config(manual())
        .spawn(&ledger, match_id)
        .await;
    alice.settle().await;
    assert_eq!(ledger.calls(MockOp::Commit), 3);
    assert_eq!(alice.handle.state().await.unwrap(), SyncState::MyTurnPending);

    alice.handle.trigger().await.unwrap();
    alice.settle().await;

    assert_eq!(ledger.calls(MockOp::Commit), 4);
    assert_eq!(
        alice.handle.state().await.unwrap(),
        SyncState::WaitingOnOpponentCommit
    );
    assert!(ledger.match_record(match_id).unwrap().pending_moves[0].is_committed());

    alice.stop().await;
}

/// An empty provider halts the synchronizer without leaving the match.
#[tokio::test]
async fn closed_provider_halts_without_withdraw() {
    let ledger = MockLedger::new();
    let match_id = paired(&ledger).await;

    let alice = PlayerSetup::new(ALICE, Arc::new(ScriptedMoveProvider::new([])))
        .config(manual())
        .spawn(&ledger, match_id)
        .await;
    alice.settle().await;

    alice.handle.trigger().await.unwrap();
    alice.settle().await;

    assert_eq!(ledger.calls(MockOp::Commit), 0);
    assert_eq!(ledger.calls(MockOp::Withdraw), 0);
    // Halted: the manual trigger did not start another observation.
    assert_eq!(ledger.calls(MockOp::GetMatch), 1);

    alice.stop().await;
}

//! Restart, lost-commit and forfeit handling against the in-memory ledger.
mod common;

use std::sync::Arc;

use client_ledger_core::{MockFault, MockLedger, MockOp};
use common::{ALICE, BOB, PlayerSetup, manual, memory_store, mv, paired};
use runtime::{
    ExitReason, ExitState, FilePendingCommitRepository, ManualClock, PendingCommit,
    PendingCommitRepository, ScriptedMoveProvider, SyncConfig, SyncState,
};
use tempfile::TempDir;

/// A client that committed and then crashed reveals the stored move after a
/// restart, without asking its provider again.
#[tokio::test]
async fn restart_reveals_from_persisted_commit() {
    let dir = TempDir::new().unwrap();
    let ledger = MockLedger::new();
    let match_id = paired(&ledger).await;

    let store = Arc::new(FilePendingCommitRepository::new(dir.path()).unwrap());
    let before = PlayerSetup::new(ALICE, Arc::new(ScriptedMoveProvider::new([mv(7)])))
        .store(store)
        .config(manual())
        .spawn(&ledger, match_id)
        .await;
    before.settle().await;

    let snapshot = before.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.pending, Some(PendingCommit::new(match_id, mv(7), 0)));
    before.stop().await;

    ledger.commit_as(match_id, BOB, mv(2));

    // Fresh store instance over the same directory, empty provider.
    let store = Arc::new(FilePendingCommitRepository::new(dir.path()).unwrap());
    let after = PlayerSetup::new(ALICE, Arc::new(ScriptedMoveProvider::new([])))
        .store(store.clone())
        .config(manual())
        .spawn(&ledger, match_id)
        .await;
    after.settle().await;

    let record = ledger.match_record(match_id).unwrap();
    assert_eq!(record.pending_moves[0].revealed, Some(mv(7)));
    assert_eq!(ledger.calls(MockOp::Commit), 1);
    assert_eq!(store.load(ALICE).unwrap(), None);
    assert_eq!(
        after.handle.state().await.unwrap(),
        SyncState::WaitingOnOpponentReveal
    );

    after.stop().await;
}

/// A commit on the ledger with no local record cannot be revealed; the
/// client gives the match up.
#[tokio::test]
async fn lost_commit_withdraws() {
    let ledger = MockLedger::new();
    let match_id = paired(&ledger).await;
    ledger.commit_as(match_id, ALICE, mv(1));
    ledger.commit_as(match_id, BOB, mv(2));

    let mut alice = PlayerSetup::new(ALICE, Arc::new(ScriptedMoveProvider::repeating(mv(1))))
        .config(manual())
        .spawn(&ledger, match_id)
        .await;

    assert_eq!(alice.exited(match_id).await, ExitReason::LostCommit);
    assert_eq!(ledger.calls(MockOp::Reveal), 0);
    assert_eq!(ledger.calls(MockOp::Withdraw), 1);
    assert_eq!(ledger.match_record(match_id).unwrap().escaped, Some(ALICE));

    alice.stop().await;
}

/// A stored commit whose move does not open the ledger commitment counts as
/// lost too.
#[tokio::test]
async fn mismatched_stored_commit_is_lost() {
    let ledger = MockLedger::new();
    let match_id = paired(&ledger).await;
    ledger.commit_as(match_id, ALICE, mv(1));
    ledger.commit_as(match_id, BOB, mv(2));

    let store = memory_store();
    store
        .save(ALICE, &PendingCommit::new(match_id, mv(9), 0))
        .unwrap();

    let mut alice = PlayerSetup::new(ALICE, Arc::new(ScriptedMoveProvider::new([])))
        .store(store)
        .config(manual())
        .spawn(&ledger, match_id)
        .await;

    assert_eq!(alice.exited(match_id).await, ExitReason::LostCommit);
    assert_eq!(ledger.calls(MockOp::Reveal), 0);

    alice.stop().await;
}

/// A reveal that already landed is never sent again, however often the
/// synchronizer is triggered.
#[tokio::test]
async fn landed_reveal_is_not_resent() {
    let ledger = MockLedger::new();
    let match_id = paired(&ledger).await;
    ledger.commit_as(match_id, ALICE, mv(1));
    ledger.commit_as(match_id, BOB, mv(2));
    ledger.reveal_as(match_id, ALICE, mv(1));

    // Crashed after the reveal but before clearing the record.
    let store = memory_store();
    store
        .save(ALICE, &PendingCommit::new(match_id, mv(1), 0))
        .unwrap();

    let alice = PlayerSetup::new(ALICE, Arc::new(ScriptedMoveProvider::new([])))
        .store(store)
        .config(manual())
        .spawn(&ledger, match_id)
        .await;

    for _ in 0..3 {
        alice.handle.trigger().await.unwrap();
        alice.settle().await;
    }

    assert_eq!(ledger.calls(MockOp::Reveal), 0);
    assert_eq!(
        alice.handle.state().await.unwrap(),
        SyncState::WaitingOnOpponentReveal
    );

    alice.stop().await;
}

/// Once the opponent forfeits, repeated triggers produce a single withdraw.
#[tokio::test]
async fn forfeit_withdraws_exactly_once() {
    let ledger = MockLedger::new();
    let match_id = paired(&ledger).await;

    let mut alice = PlayerSetup::new(ALICE, Arc::new(ScriptedMoveProvider::repeating(mv(1))))
        .config(manual())
        .spawn(&ledger, match_id)
        .await;
    alice.settle().await;

    ledger.forfeit(match_id, BOB);
    for _ in 0..5 {
        alice.handle.trigger().await.unwrap();
    }

    assert_eq!(alice.exited(match_id).await, ExitReason::Forfeited);
    alice.settle().await;

    alice.handle.trigger().await.unwrap();
    alice.settle().await;

    assert_eq!(ledger.calls(MockOp::Withdraw), 1);
    assert_eq!(alice.handle.snapshot().await.unwrap().exit, ExitState::Done);

    alice.stop().await;
}

/// A failed withdraw is retried on the next trigger.
#[tokio::test]
async fn failed_withdraw_is_retried() {
    let ledger = MockLedger::new();
    let match_id = paired(&ledger).await;
    ledger.forfeit(match_id, BOB);
    // The submitter retries transient faults itself; exhaust its attempts.
    for _ in 0..3 {
        ledger.fail_next(MockOp::Withdraw, client_ledger_core::MockFault::Transport);
    }

    let mut alice = PlayerSetup::new(ALICE, Arc::new(ScriptedMoveProvider::repeating(mv(1))))
        .config(manual())
        .spawn(&ledger, match_id)
        .await;
    alice.settle().await;
    assert_eq!(
        alice.handle.snapshot().await.unwrap().exit,
        ExitState::NotStarted
    );

    alice.handle.trigger().await.unwrap();
    assert_eq!(alice.exited(match_id).await, ExitReason::Forfeited);
    assert_eq!(ledger.calls(MockOp::Withdraw), 4);

    alice.stop().await;
}

/// An opponent who stops playing leaves the match stuck until the deadline
/// plus the abandon margin has passed; then the client withdraws once.
#[tokio::test]
async fn stalled_match_is_abandoned_after_the_margin() {
    let ledger = MockLedger::new();
    let match_id = paired(&ledger).await;
    ledger.update_match(match_id, |m| m.timeout_at = Some(1_000));
    let clock = ManualClock::new(900);

    let mut alice = PlayerSetup::new(ALICE, Arc::new(ScriptedMoveProvider::repeating(mv(1))))
        .config(SyncConfig {
            abandon_margin_secs: 60,
            ..manual()
        })
        .clock(Arc::new(clock.clone()))
        .spawn(&ledger, match_id)
        .await;
    alice.settle().await;
    assert_eq!(ledger.calls(MockOp::Commit), 1);
    assert_eq!(
        alice.handle.state().await.unwrap(),
        SyncState::WaitingOnOpponentCommit
    );

    // Past the deadline but inside the margin: keep waiting.
    clock.set(1_060);
    alice.handle.trigger().await.unwrap();
    alice.settle().await;
    assert_eq!(ledger.calls(MockOp::Withdraw), 0);

    clock.set(1_061);
    alice.handle.trigger().await.unwrap();
    assert_eq!(alice.exited(match_id).await, ExitReason::Abandoned);

    for _ in 0..3 {
        alice.handle.trigger().await.unwrap();
        alice.settle().await;
    }
    assert_eq!(ledger.calls(MockOp::Withdraw), 1);
    assert_eq!(alice.handle.state().await.unwrap(), SyncState::MatchOver);
    assert_eq!(
        alice.handle.snapshot().await.unwrap().exit,
        ExitState::Done
    );

    alice.stop().await;
}

/// A commit whose receipt never arrived is found on the ledger and kept; the
/// client does not resend it or give up the match.
#[tokio::test]
async fn lost_commit_receipt_does_not_withdraw() {
    let ledger = MockLedger::new();
    let match_id = paired(&ledger).await;
    ledger.fail_next(MockOp::Commit, MockFault::LostResponse);

    let alice = PlayerSetup::new(ALICE, Arc::new(ScriptedMoveProvider::repeating(mv(1))))
        .config(manual())
        .spawn(&ledger, match_id)
        .await;
    alice.settle().await;

    assert_eq!(ledger.calls(MockOp::Commit), 1);
    assert_eq!(ledger.calls(MockOp::Withdraw), 0);
    assert_eq!(
        alice.handle.state().await.unwrap(),
        SyncState::WaitingOnOpponentCommit
    );
    assert_eq!(
        alice.handle.snapshot().await.unwrap().pending,
        Some(PendingCommit::new(match_id, mv(1), 0))
    );

    alice.stop().await;
}

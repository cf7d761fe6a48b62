//! Turn synchronization.
//!
//! [`derive_state`] maps a match snapshot to the local participant's
//! [`SyncState`]; the [`worker`] actor refreshes the snapshot on every
//! trigger and acts on the derived state.
mod worker;

pub use worker::{SyncContext, SyncSnapshot};
pub(crate) use worker::Command;

use std::collections::HashSet;
use std::hash::Hash;

use battle_core::{Address, Match, Phase};
use serde::{Deserialize, Serialize};

use crate::config::ProtocolMode;
use crate::events::ExitReason;

/// What the local participant should be doing right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncState {
    NotInMatch,
    AwaitingOpponent,
    /// Our move (commit, reveal or open move) is due.
    MyTurnPending,
    WaitingOnOpponentCommit,
    WaitingOnOpponentReveal,
    MatchOver,
}

/// Derives the synchronizer state from a snapshot. Pure.
pub fn derive_state(
    record: Option<&Match>,
    me: Address,
    protocol: ProtocolMode,
    now_secs: u64,
    abandon_margin_secs: u64,
) -> SyncState {
    let Some(record) = record else {
        return SyncState::NotInMatch;
    };
    let Some(seat) = record.seat_of(me) else {
        return SyncState::NotInMatch;
    };

    if record.is_over()
        || record.is_forfeited()
        || record.is_abandoned(now_secs, abandon_margin_secs)
    {
        return SyncState::MatchOver;
    }
    if record.awaiting_opponent() {
        return SyncState::AwaitingOpponent;
    }

    let mine = record.pending_move(seat);

    if protocol == ProtocolMode::RevealOnly {
        return if mine.is_revealed() {
            SyncState::WaitingOnOpponentReveal
        } else {
            SyncState::MyTurnPending
        };
    }

    match record.phase {
        Phase::Commit if mine.is_committed() => SyncState::WaitingOnOpponentCommit,
        Phase::Reveal if mine.is_revealed() => SyncState::WaitingOnOpponentReveal,
        Phase::Commit | Phase::Reveal => SyncState::MyTurnPending,
        Phase::GameOver => SyncState::MatchOver,
    }
}

/// Why a `MatchOver` snapshot ended.
pub fn exit_reason(record: &Match) -> ExitReason {
    if record.is_over() {
        ExitReason::GameOver
    } else if record.is_forfeited() {
        ExitReason::Forfeited
    } else {
        ExitReason::Abandoned
    }
}

/// Tracks keys with an operation in flight.
#[derive(Debug)]
pub struct SingleFlight<K> {
    active: HashSet<K>,
}

impl<K: Eq + Hash> SingleFlight<K> {
    pub fn new() -> Self {
        Self {
            active: HashSet::new(),
        }
    }

    /// Claims `key`. Returns false if it is already in flight.
    pub fn try_begin(&mut self, key: K) -> bool {
        self.active.insert(key)
    }

    pub fn finish(&mut self, key: &K) {
        self.active.remove(key);
    }

    pub fn is_active(&self, key: &K) -> bool {
        self.active.contains(key)
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }
}

impl<K: Eq + Hash> Default for SingleFlight<K> {
    fn default() -> Self {
        Self::new()
    }
}

//! Per-match projection of ledger state owned by the synchronizer actor.
//!
//! The cache replaces the match record wholesale on every accepted refresh,
//! tracks the round-advance edge that gates new commits, remembers how far
//! the event log has been read, and records whether the exit has run.
use battle_core::{DecodedEvent, Match, MatchId};
use serde::{Deserialize, Serialize};

use crate::repository::PendingCommit;

/// Progress of the withdraw for the cached match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitState {
    #[default]
    NotStarted,
    InFlight,
    Done,
}

#[derive(Debug, Default)]
pub struct MatchStateCache {
    current: Option<Match>,
    round_advanced: bool,
    pending: Option<PendingCommit>,
    log_cursor: u64,
    last_event_id: Option<u64>,
    exit: ExitState,
}

impl MatchStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Match> {
        self.current.as_ref()
    }

    pub fn match_id(&self) -> Option<MatchId> {
        self.current.as_ref().map(|m| m.id)
    }

    /// Replaces the cached match with `snapshot`.
    ///
    /// Returns false when the snapshot is older than the cached one. A
    /// snapshot for a different match resets the cache entirely.
    pub fn refresh(&mut self, snapshot: Match) -> bool {
        if let Some(current) = &self.current {
            if current.id != snapshot.id {
                tracing::debug!(
                    target: "runtime::cache",
                    from = %current.id,
                    to = %snapshot.id,
                    "Match changed, resetting cache"
                );
                *self = Self::default();
            } else if snapshot.progress() < current.progress() {
                tracing::debug!(
                    target: "runtime::cache",
                    match_id = %snapshot.id,
                    cached_round = current.round,
                    snapshot_round = snapshot.round,
                    "Ignoring stale snapshot"
                );
                return false;
            }
        }

        let advanced = self
            .current
            .as_ref()
            .is_none_or(|current| snapshot.round > current.round);
        if advanced {
            self.round_advanced = true;
        }

        self.current = Some(snapshot);
        true
    }

    /// True once per observed round transition.
    pub fn observed_round_advance(&mut self) -> bool {
        std::mem::take(&mut self.round_advanced)
    }

    /// Restores the edge consumed by a commit attempt that did not land.
    pub fn rearm_round_advance(&mut self) {
        self.round_advanced = true;
    }

    pub fn pending(&self) -> Option<&PendingCommit> {
        self.pending.as_ref()
    }

    pub fn set_pending(&mut self, pending: Option<PendingCommit>) {
        self.pending = pending;
    }

    /// Offset of the next event page to fetch.
    pub fn log_cursor(&self) -> u64 {
        self.log_cursor
    }

    /// Highest event id published so far; `None` before the first event.
    pub fn last_event_id(&self) -> Option<u64> {
        self.last_event_id
    }

    /// Records a fetched log range and returns only events not seen before.
    pub fn advance_log(&mut self, events: Vec<DecodedEvent>, next_offset: u64) -> Vec<DecodedEvent> {
        self.log_cursor = self.log_cursor.max(next_offset);

        let fresh: Vec<_> = events
            .into_iter()
            .filter(|event| self.last_event_id.is_none_or(|last| event.id > last))
            .collect();
        if let Some(last) = fresh.iter().map(|event| event.id).max() {
            self.last_event_id = Some(last);
        }
        fresh
    }

    pub fn exit_state(&self) -> ExitState {
        self.exit
    }

    /// Claims the exit. Returns false if it is already in flight or done.
    pub fn begin_exit(&mut self) -> bool {
        if self.exit != ExitState::NotStarted {
            return false;
        }
        self.exit = ExitState::InFlight;
        true
    }

    pub fn finish_exit(&mut self) {
        self.exit = ExitState::Done;
        self.pending = None;
    }

    /// Releases a failed exit so a later trigger can retry it.
    pub fn abort_exit(&mut self) {
        if self.exit == ExitState::InFlight {
            self.exit = ExitState::NotStarted;
        }
    }
}

//! Asynchronous abstraction for sourcing the local participant's moves.
//!
//! The synchronizer asks a [`MoveProvider`] whenever a new round opens, so the
//! same runtime can be driven by a human prompt, a random bot, or a script.
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use battle_core::{Match, MatchId, MoveCatalog, MoveRef, Seat};
use rand::seq::SliceRandom;

use super::errors::{Result, RuntimeError};

/// Everything a provider needs to pick a move.
#[derive(Debug, Clone)]
pub struct MoveRequest {
    pub match_id: MatchId,
    pub round: u64,
    pub seat: Seat,
    /// Match snapshot the request was derived from.
    pub record: Match,
}

impl MoveRequest {
    pub fn new(record: Match, seat: Seat) -> Self {
        Self {
            match_id: record.id,
            round: record.round,
            seat,
            record,
        }
    }
}

/// Trait for choosing a move for the current round.
///
/// Returning [`RuntimeError::ProviderClosed`] tells the synchronizer that no
/// further moves will come (e.g. the user quit the prompt).
#[async_trait]
pub trait MoveProvider: Send + Sync {
    async fn select_move(&self, request: &MoveRequest) -> Result<MoveRef>;
}

/// Picks uniformly from the catalog.
pub struct RandomMoveProvider {
    catalog: MoveCatalog,
    offense_only: bool,
}

impl RandomMoveProvider {
    pub fn new(catalog: MoveCatalog, offense_only: bool) -> Self {
        Self {
            catalog,
            offense_only,
        }
    }

    fn pick(&self) -> Option<MoveRef> {
        let choices = self.catalog.choices(self.offense_only);
        choices
            .choose(&mut rand::thread_rng())
            .map(|(_, mv)| *mv)
    }
}

#[async_trait]
impl MoveProvider for RandomMoveProvider {
    async fn select_move(&self, request: &MoveRequest) -> Result<MoveRef> {
        let mv = self.pick().ok_or_else(|| {
            RuntimeError::NoMoveAvailable(if self.offense_only {
                "catalog has no offensive moves".to_string()
            } else {
                "catalog is empty".to_string()
            })
        })?;

        tracing::debug!(
            target: "runtime::providers",
            match_id = %request.match_id,
            round = request.round,
            move_label = %self.catalog.move_label(mv),
            "Random move selected"
        );
        Ok(mv)
    }
}

/// Plays a fixed list of moves in order.
///
/// Once the script runs out the provider repeats `fallback`, or reports
/// itself closed when there is none.
#[derive(Default)]
pub struct ScriptedMoveProvider {
    moves: Mutex<VecDeque<MoveRef>>,
    fallback: Option<MoveRef>,
}

impl ScriptedMoveProvider {
    pub fn new(moves: impl IntoIterator<Item = MoveRef>) -> Self {
        Self {
            moves: Mutex::new(moves.into_iter().collect()),
            fallback: None,
        }
    }

    /// Always answers with `mv`.
    pub fn repeating(mv: MoveRef) -> Self {
        Self::new([]).with_fallback(mv)
    }

    pub fn with_fallback(mut self, mv: MoveRef) -> Self {
        self.fallback = Some(mv);
        self
    }

    pub fn remaining(&self) -> usize {
        self.moves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl MoveProvider for ScriptedMoveProvider {
    async fn select_move(&self, _request: &MoveRequest) -> Result<MoveRef> {
        let next = self
            .moves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        next.or(self.fallback).ok_or(RuntimeError::ProviderClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_core::{Address, Participant, Team};

    fn request() -> MoveRequest {
        let record = Match::new(
            MatchId(1),
            Participant::new(Address::repeat_byte(1), Team::new(1, 2)),
            Participant::new(Address::repeat_byte(2), Team::new(3, 4)),
        );
        MoveRequest::new(record, Seat::Challenger)
    }

    #[tokio::test]
    async fn random_provider_respects_offense_filter() {
        let catalog = MoveCatalog::synthetic();
        let provider = RandomMoveProvider::new(catalog.clone(), true);
        for _ in 0..20 {
            let mv = provider.select_move(&request()).await.unwrap();
            assert!(catalog.kind_of(mv).unwrap().is_offensive());
        }
    }

    #[tokio::test]
    async fn random_provider_fails_on_empty_catalog() {
        let provider = RandomMoveProvider::new(MoveCatalog::default(), false);
        assert!(matches!(
            provider.select_move(&request()).await,
            Err(RuntimeError::NoMoveAvailable(_))
        ));
    }

    #[tokio::test]
    async fn scripted_provider_drains_then_closes() {
        let a = MoveRef(Address::repeat_byte(0xa));
        let b = MoveRef(Address::repeat_byte(0xb));
        let provider = ScriptedMoveProvider::new([a, b]);

        assert_eq!(provider.select_move(&request()).await.unwrap(), a);
        assert_eq!(provider.select_move(&request()).await.unwrap(), b);
        assert!(matches!(
            provider.select_move(&request()).await,
            Err(RuntimeError::ProviderClosed)
        ));

        let repeating = ScriptedMoveProvider::repeating(a);
        assert_eq!(repeating.select_move(&request()).await.unwrap(), a);
        assert_eq!(repeating.select_move(&request()).await.unwrap(), a);
    }
}

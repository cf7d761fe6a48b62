//! Ledger abstraction traits.
//!
//! This module defines a layered ledger abstraction:
//! - Layer 0: LedgerTransport (raw contract calls, no game knowledge)
//! - Layer 1: MatchQueries, MoveTransactions, Matchmaking (game domain)
//! - Layer 2: LedgerGateway (composite trait)

use async_trait::async_trait;
use battle_core::{Address, B256, DecodeError, DecodedEvent, GameMode, Match, MatchId, MoveRef, Team};
use tokio::sync::mpsc;

use crate::rejection::{Rejection, RejectionClass};
use crate::types::{Challenge, EventPage, LedgerInfo, RawLogRecord, Receipt};

// ============================================================================
// Error Types
// ============================================================================

/// Transport layer errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backend-specific error: {0}")]
    Backend(String),
}

/// Errors returned by every domain-level ledger call.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Node or network unavailable; the same call may succeed later.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The ledger evaluated the call and refused it.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    /// A known event record carried a malformed payload.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The ledger answered with data this client cannot interpret.
    #[error("Invalid ledger data: {0}")]
    InvalidData(String),
}

impl LedgerError {
    pub fn rejected(message: impl Into<String>) -> Self {
        LedgerError::Rejected(Rejection::from_message(message))
    }

    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Transport(_))
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            LedgerError::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }

    pub fn rejection_class(&self) -> Option<RejectionClass> {
        self.rejection().map(Rejection::class)
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

// ============================================================================
// Layer 0: Pure Infrastructure
// ============================================================================

/// Raw contract access without any game-specific knowledge.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Executes a read-only call and returns the ABI-encoded result.
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>>;

    /// Sends a state-changing transaction and waits for its receipt.
    ///
    /// Implementations simulate the call first so revert reasons surface as
    /// [`LedgerError::Rejected`] before anything is broadcast.
    async fn send(&self, to: Address, data: Vec<u8>) -> Result<Receipt>;

    /// Identity transactions are sent from.
    fn sender(&self) -> Address;

    /// Health check: verify the node is reachable.
    async fn health_check(&self) -> Result<()>;
}

// ============================================================================
// Layer 1: Game Domain Traits
// ============================================================================

/// Read access to match records and event logs.
#[async_trait]
pub trait MatchQueries: Send + Sync {
    /// Current match of `participant`, if any.
    async fn get_match_by_participant(&self, participant: Address) -> Result<Option<Match>>;

    async fn get_match(&self, match_id: MatchId) -> Result<Match>;

    /// Raw log records starting at `offset` (at most one page).
    async fn fetch_log_page(&self, match_id: MatchId, offset: u64) -> Result<Vec<RawLogRecord>>;

    /// Decoded log page starting at `offset`.
    async fn get_event_log_page(&self, match_id: MatchId, offset: u64) -> Result<EventPage> {
        let records = self.fetch_log_page(match_id, offset).await?;
        Ok(EventPage::from_records(offset, &records))
    }

    /// Reads pages from `offset` until a short page ends the log.
    ///
    /// Returns the decoded events and the offset to resume from.
    async fn read_log_from(
        &self,
        match_id: MatchId,
        offset: u64,
    ) -> Result<(Vec<DecodedEvent>, u64)> {
        let mut events = Vec::new();
        let mut cursor = offset;
        loop {
            let page = self.get_event_log_page(match_id, cursor).await?;
            cursor = page.next_offset;
            let last = page.is_last();
            events.extend(page.events);
            if last {
                break;
            }
        }
        Ok((events, cursor))
    }
}

/// Commit-reveal submissions for the local participant.
#[async_trait]
pub trait MoveTransactions: Send + Sync {
    async fn submit_commit(&self, match_id: MatchId, commit: B256) -> Result<Receipt>;

    async fn submit_reveal(&self, match_id: MatchId, mv: MoveRef, secret: B256) -> Result<Receipt>;

    /// Reveal-only modes accept the move in the clear without a prior commit.
    async fn submit_open_move(&self, match_id: MatchId, mv: MoveRef) -> Result<Receipt>;

    /// Leaves a match (after game over, a forfeit, or an abandoned match).
    async fn withdraw(&self, match_id: MatchId) -> Result<Receipt>;
}

/// Ways of entering a match.
#[async_trait]
pub trait Matchmaking: Send + Sync {
    async fn join_queue(&self, mode: GameMode, team: Team) -> Result<Receipt>;

    async fn leave_queue(&self, mode: GameMode) -> Result<Receipt>;

    /// Participant currently waiting in the queue for `mode`.
    async fn queued_participant(&self, mode: GameMode) -> Result<Option<Address>>;

    async fn challenge(&self, mode: GameMode, team: Team, opponent: Address) -> Result<Receipt>;

    /// Accepts a challenge and returns the match it created.
    async fn accept_challenge(&self, challenge_id: MatchId, team: Team) -> Result<MatchId>;

    /// Withdraws (challenger) or declines (opponent) a pending challenge.
    async fn reject_challenge(&self, challenge_id: MatchId) -> Result<Receipt>;

    async fn list_challenges(&self, participant: Address, mode: GameMode)
    -> Result<Vec<Challenge>>;
}

/// Push notifications for protocol-domain events of one match.
#[async_trait]
pub trait ProtocolEventSource: Send + Sync {
    async fn subscribe(&self, match_id: MatchId) -> Result<mpsc::Receiver<DecodedEvent>>;
}

// ============================================================================
// Layer 2: Composite Interface
// ============================================================================

/// Complete ledger interface used by the runtime.
#[async_trait]
pub trait LedgerGateway: MatchQueries + MoveTransactions + Matchmaking {
    fn info(&self) -> LedgerInfo;

    /// Identity this gateway acts for.
    fn participant(&self) -> Address {
        self.info().participant
    }

    async fn health_check(&self) -> Result<()>;
}

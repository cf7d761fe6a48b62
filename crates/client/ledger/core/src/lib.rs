//! Ledger abstraction layer for battle clients.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: LedgerGateway (composite trait)
//!          ├── MatchQueries
//!          ├── MoveTransactions
//!          └── Matchmaking
//!
//! Layer 1: Domain Traits (matches, moves, matchmaking)
//!
//! Layer 0: LedgerTransport (raw contract calls)
//! ```
//!
//! Revert strings are classified into [`RejectionReason`] inside gateway
//! implementations. Callers above this crate branch on the enum only.
//!
//! # Usage
//!
//! ```ignore
//! use client_ledger_core::{LedgerGateway, MatchQueries};
//!
//! async fn current(ledger: &dyn LedgerGateway) -> Result<Option<Match>> {
//!     ledger.get_match_by_participant(ledger.participant()).await
//! }
//! ```

pub mod rejection;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use rejection::{Rejection, RejectionClass, RejectionReason};
pub use traits::{
    LedgerError, LedgerGateway, LedgerTransport, MatchQueries, Matchmaking, MoveTransactions,
    ProtocolEventSource, Result, TransportError,
};
pub use types::{
    Challenge, ChallengeStatus, EVENT_PAGE_SIZE, EventPage, LedgerInfo, RawLogRecord, Receipt,
};

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockClient, MockFault, MockLedger, MockOp, SubmissionGate};

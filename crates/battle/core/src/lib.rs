//! Deterministic battle data types shared across clients.
//!
//! `battle-core` mirrors the ledger's match model, computes commit-reveal
//! commitments, and decodes the ledger's tagged event log. Nothing here
//! performs I/O, so every crate in the workspace (runtime, ledger gateways,
//! frontends) can depend on it freely.
pub mod catalog;
pub mod commitment;
pub mod error;
pub mod events;
pub mod types;

pub use catalog::{Element, MONSTER_TYPES, MoveCatalog, MoveKind, monster_name};
pub use commitment::{COMMIT_SECRET, commitment, verify};
pub use error::DecodeError;
pub use events::{
    DecodedEvent, Domain, EventKind, PROTOCOL_DOMAIN_THRESHOLD, REGISTRY_VERSION, decode,
    try_decode,
};
pub use types::{
    ChallengeMode, GameMode, Match, MatchId, MoveRef, Participant, PendingMove, Phase, Seat, Team,
};

pub use alloy_primitives::{Address, B256};

//! Client runtime for commit-reveal monster battles.
//!
//! This crate drives one participant through the ledger's match lifecycle:
//! it acquires a match, keeps a local view of it in sync with the ledger,
//! commits and reveals moves, and withdraws once the match is over.
//! Consumers embed [`ParticipantSession`] to play matches end to end, or
//! spawn a single synchronizer from a [`SyncContext`] and talk to it through
//! [`SyncHandle`].
//!
//! Modules are organized by responsibility:
//! - [`sync`] hosts the per-match turn synchronizer actor
//! - [`submission`] commits and reveals moves with retry and recovery
//! - [`acquisition`] finds matches through the queue or challenges
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides the topic-based event bus
//! - [`repository`] persists pending commitments across restarts
pub mod acquisition;
pub mod api;
pub mod cache;
pub mod config;
pub mod events;
pub mod repository;
pub mod session;
pub mod submission;
pub mod sync;

pub use acquisition::{
    AcquireStep, AcquisitionStrategy, ChallengeStrategy, HybridStrategy, QueueStrategy,
    RespondPolicy, RespondStrategy,
};
pub use api::{
    Disposition, MoveProvider, MoveRequest, RandomMoveProvider, Result, RuntimeError,
    ScriptedMoveProvider, SyncHandle,
};
pub use cache::{ExitState, MatchStateCache};
pub use config::{
    Clock, ManualClock, ProtocolMode, RetryPolicy, SessionConfig, SyncConfig, SystemClock,
    TeamSelection,
};
pub use events::{Event, EventBus, ExitReason, LifecycleEvent, Topic, TurnEvent};
pub use repository::{
    FilePendingCommitRepository, InMemoryPendingCommitRepository, PendingCommit,
    PendingCommitRepository, RepositoryError,
};
pub use session::{MatchOutcome, ParticipantSession, SessionStep};
pub use submission::{MoveSubmitter, SubmissionState, SubmitOutcome};
pub use sync::{SyncContext, SyncSnapshot, SyncState, derive_state};

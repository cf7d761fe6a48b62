//! Public runtime API surface.
//!
//! This module gathers the types exposed to consumers of the runtime crate so
//! other layers can stay focused on orchestration or infrastructure.

pub mod errors;
pub mod handle;
pub mod providers;

pub use errors::{Disposition, Result, RuntimeError};
pub use handle::SyncHandle;
pub use providers::{MoveProvider, MoveRequest, RandomMoveProvider, ScriptedMoveProvider};

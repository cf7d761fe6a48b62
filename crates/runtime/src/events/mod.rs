//! Topic-based event bus for runtime events.
//!
//! Ledger log events are split into the `Battle` and `Protocol` topics by
//! discriminant domain; the synchronizer adds `Turn` and `Lifecycle`
//! notifications. Consumers subscribe only to the topics they render.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::{ExitReason, LifecycleEvent, TurnEvent};

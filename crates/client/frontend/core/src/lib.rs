//! Cross-frontend primitives for presenting battles.
//!
//! Houses presentation config, event formatting and the message log that
//! both the interactive CLI and the bot's console output reuse.
pub mod config;
pub mod event;
pub mod format;
pub mod frontend;
pub mod message;

pub use config::{EventVisibility, FrontendConfig, MessageConfig};
pub use event::{EventConsumer, EventImpact, MessageConsumer};
pub use frontend::Frontend;
pub use message::{MessageEntry, MessageLevel, MessageLog};

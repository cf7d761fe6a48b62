//! Player input plumbing between the synchronizer and the console.
mod provider;

pub use provider::{MovePrompt, PromptMoveProvider};

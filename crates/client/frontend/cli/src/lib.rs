//! Line-based console frontend for battles.
//!
//! The [`Repl`] reads commands from stdin, drives matchmaking directly
//! through the ledger gateway, and runs a turn synchronizer for the current
//! match. Moves are chosen interactively: the synchronizer asks the
//! [`PromptMoveProvider`], which forwards the request to the REPL and waits
//! for the player's answer.

mod config;
mod input;
pub mod logging;
pub mod presentation;
mod repl;

pub use config::CliConfig;
pub use input::{MovePrompt, PromptMoveProvider};
pub use presentation::ConsolePresenter;
pub use repl::{CommandError, Repl, ReplCommand};

pub use client_frontend_core::FrontendConfig;

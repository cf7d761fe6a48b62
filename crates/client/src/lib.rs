//! Composition root for the `battles` binary.
//!
//! ```text
//! battles
//!   ├─→ ledger      (EVM gateway from the environment)
//!   ├─→ runtime     (sessions, synchronizers, PendingCommit store)
//!   └─→ frontend    (REPL for `play`, stderr logs for `bot`)
//! ```
//!
//! Each subcommand builds only the layers it needs. The ledger is the only
//! shared state, so commands never talk to each other.

pub mod cli;
pub mod commands;
pub mod ledger;

pub use cli::{BotArgs, Cli, Command, SimulateArgs};
pub use ledger::Connection;

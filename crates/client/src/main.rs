//! `battles`: command-line client for commit-reveal battles.
//!
//! ```bash
//! # Interactive console against the configured ledger
//! battles play
//!
//! # Unattended bot, five matches
//! battles bot --matches 5
//!
//! # Inspect a match
//! battles debug-match 12
//! battles debug-log 12
//!
//! # Two bots on an in-memory ledger, no network needed
//! battles simulate --matches 3 --rounds 4
//! ```

use anyhow::Result;
use battle_client::Cli;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    battle_client::commands::run(cli).await
}

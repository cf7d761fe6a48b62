//! Command-line arguments.
use battle_core::{Address, ChallengeMode};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "battles", version, about = "Commit-reveal battle client")]
pub struct Cli {
    /// Names the log file; defaults to a timestamped session.
    #[arg(long, global = true)]
    pub session: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Play matches unattended with random moves.
    Bot(BotArgs),
    /// Interactive console.
    Play,
    /// Print a match record as JSON.
    DebugMatch {
        match_id: u64,
    },
    /// Print every record in a match's event log.
    DebugLog {
        match_id: u64,
    },
    /// Run two bots against each other on an in-memory ledger.
    Simulate(SimulateArgs),
}

#[derive(Clone, Debug, Args)]
pub struct BotArgs {
    /// How the configured mode pairs participants: queue, only-challenge or
    /// queue-and-challenge.
    #[arg(long, default_value = "queue")]
    pub challenge_mode: ChallengeMode,

    /// Stop after this many matches instead of running until interrupted.
    #[arg(long)]
    pub matches: Option<usize>,

    /// Challenge this participant instead of using the mode's default.
    #[arg(long)]
    pub opponent: Option<Address>,
}

#[derive(Clone, Debug, Args)]
pub struct SimulateArgs {
    #[arg(long, default_value_t = 1)]
    pub matches: usize,

    /// Rounds until the in-memory ledger declares game over.
    #[arg(long, default_value_t = 3)]
    pub rounds: u64,

    /// Bots only pick offensive moves.
    #[arg(long)]
    pub offense_only: bool,

    /// Synchronizer poll interval.
    #[arg(long, default_value_t = 20)]
    pub poll_ms: u64,
}

//! Subcommand entry points.
mod bot;
mod play;

pub mod debug;
pub mod simulate;

use std::io;

use anyhow::Result;
use battle_core::MatchId;
use client_frontend_cli::logging::setup_logging;
use tracing::info;

use crate::cli::{Cli, Command};
use crate::ledger::connect;

pub async fn run(cli: Cli) -> Result<()> {
    let session = cli.session.as_deref();

    match cli.command {
        Command::Bot(args) => bot::run(session, args).await,
        Command::Play => play::run(session).await,
        Command::DebugMatch { match_id } => {
            let _guard = setup_logging(session, true)?;
            let connection = connect().await?;
            debug::write_match(connection.gateway.as_ref(), MatchId(match_id), &mut io::stdout())
                .await
        }
        Command::DebugLog { match_id } => {
            let _guard = setup_logging(session, true)?;
            let connection = connect().await?;
            let records = debug::write_log(
                connection.gateway.as_ref(),
                &connection.catalog,
                MatchId(match_id),
                &mut io::stdout(),
            )
            .await?;
            info!(target: "client::debug", match_id, records, "Log dumped");
            Ok(())
        }
        Command::Simulate(args) => {
            let _guard = setup_logging(session, true)?;
            let report = simulate::simulate(&args).await?;
            simulate::print_report(&report, &mut io::stdout())
        }
    }
}

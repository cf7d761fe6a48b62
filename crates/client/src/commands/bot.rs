//! Unattended play with random moves.
use std::sync::Arc;

use anyhow::{Context, Result};
use client_frontend_cli::logging::setup_logging;
use client_frontend_core::format::describe_lifecycle;
use runtime::acquisition::{self, AcquisitionStrategy, ChallengeStrategy};
use runtime::{
    Event, EventBus, FilePendingCommitRepository, ParticipantSession, RandomMoveProvider,
    RetryPolicy, SessionConfig, Topic,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cli::BotArgs;
use crate::ledger::connect;

pub async fn run(session_id: Option<&str>, args: BotArgs) -> Result<()> {
    let _guard = setup_logging(session_id, true)?;
    let connection = connect().await?;

    let config = SessionConfig::from_env();
    let store = FilePendingCommitRepository::new(&config.data_dir)
        .with_context(|| format!("opening commit store at {}", config.data_dir.display()))?;

    let strategy: Box<dyn AcquisitionStrategy> = match args.opponent {
        Some(opponent) => Box::new(ChallengeStrategy::new(config.mode, config.team, opponent)),
        None => acquisition::for_mode(args.challenge_mode, &config),
    };
    let provider = RandomMoveProvider::new(connection.catalog.clone(), config.offense_only);

    info!(
        target: "client::bot",
        mode = %config.mode,
        challenge_mode = %args.challenge_mode,
        data_dir = %config.data_dir.display(),
        "Bot starting"
    );

    let session = ParticipantSession::new(
        connection.gateway,
        strategy,
        Arc::new(provider),
        Arc::new(store),
    )
    .with_sync_config(connection.sync)
    .with_session_config(config)
    .with_retry(RetryPolicy::from_env());
    let reporter = report_lifecycle(session.event_bus());

    let result = match args.matches {
        Some(count) => session.run_matches(count).await.map(|played| {
            for (match_id, outcome) in played {
                info!(target: "client::bot", %match_id, ?outcome, "Match played");
            }
        }),
        None => tokio::select! {
            result = session.run() => result,
            _ = tokio::signal::ctrl_c() => {
                info!(target: "client::bot", "Interrupted");
                Ok(())
            }
        },
    };

    reporter.abort();
    Ok(result?)
}

/// Logs lifecycle transitions in the same words the console uses.
fn report_lifecycle(bus: &EventBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe(Topic::Lifecycle);
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(Event::Lifecycle(event)) => {
                    info!(target: "client::bot", "{}", describe_lifecycle(&event));
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(target: "client::bot", skipped, "Lifecycle reporter fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

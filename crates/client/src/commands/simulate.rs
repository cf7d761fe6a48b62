//! Two bots playing each other on an in-memory ledger.
//!
//! Exercises the whole runtime (acquisition, synchronizers, submission,
//! exit) without a node. The first bot waits in the queue, the second only
//! joins once it sees someone waiting, so every match pairs the same two.
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use battle_core::{Address, MatchId, MoveCatalog};
use client_ledger_core::MockLedger;
use runtime::{
    InMemoryPendingCommitRepository, MatchOutcome, ParticipantSession, QueueStrategy,
    RandomMoveProvider, RetryPolicy, SessionConfig, SyncConfig, TeamSelection,
};
use tracing::info;

use crate::cli::SimulateArgs;

const CHALLENGER: Address = Address::repeat_byte(0xc1);
const OPPONENT: Address = Address::repeat_byte(0xc2);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulatedMatch {
    pub match_id: MatchId,
    pub rounds: u64,
    pub log_records: usize,
    pub challenger: MatchOutcome,
    pub opponent: MatchOutcome,
}

pub async fn simulate(args: &SimulateArgs) -> Result<Vec<SimulatedMatch>> {
    let ledger = MockLedger::new();
    ledger.set_rounds_to_finish(args.rounds.max(1));

    let interval = Duration::from_millis(args.poll_ms.max(1));
    let config = SessionConfig {
        offense_only: args.offense_only,
        wait_in_queue: true,
        idle_interval: interval,
        team: TeamSelection::Random,
        ..SessionConfig::default()
    };
    let sync = SyncConfig {
        poll_interval: interval,
        ..SyncConfig::default()
    };

    let waiting = QueueStrategy::from_config(&config);
    let joining = QueueStrategy {
        wait_in_queue: false,
        require_waiting_opponent: true,
        ..waiting.clone()
    };
    let challenger = bot(&ledger, CHALLENGER, waiting, &config, &sync);
    let opponent = bot(&ledger, OPPONENT, joining, &config, &sync);

    info!(target: "client::simulate", matches = args.matches, rounds = args.rounds, "Simulation starting");
    let (challenger_played, opponent_played) = tokio::join!(
        challenger.run_matches(args.matches),
        opponent.run_matches(args.matches)
    );
    let (challenger_played, opponent_played) = (challenger_played?, opponent_played?);

    let report = challenger_played
        .into_iter()
        .map(|(match_id, challenger)| {
            let opponent = opponent_played
                .iter()
                .find(|(id, _)| *id == match_id)
                .map(|(_, outcome)| outcome.clone())
                .unwrap_or_else(|| MatchOutcome::Halted("opponent never played".to_string()));
            let rounds = ledger
                .match_record(match_id)
                .map_or(0, |record| record.round);
            SimulatedMatch {
                match_id,
                rounds,
                log_records: ledger.log_len(match_id),
                challenger,
                opponent,
            }
        })
        .collect();
    Ok(report)
}

fn bot(
    ledger: &MockLedger,
    participant: Address,
    strategy: QueueStrategy,
    config: &SessionConfig,
    sync: &SyncConfig,
) -> ParticipantSession {
    let provider = RandomMoveProvider::new(MoveCatalog::synthetic(), config.offense_only);
    let client = Arc::new(ledger.client(participant));
    ParticipantSession::new(
        client.clone(),
        Box::new(strategy),
        Arc::new(provider),
        Arc::new(InMemoryPendingCommitRepository::new()),
    )
    .with_push_source(client)
    .with_sync_config(sync.clone())
    .with_session_config(config.clone())
    .with_retry(RetryPolicy::none())
}

pub fn print_report(report: &[SimulatedMatch], out: &mut impl Write) -> Result<()> {
    for played in report {
        writeln!(
            out,
            "{}: {} rounds, {} log records, challenger {}, opponent {}",
            played.match_id,
            played.rounds,
            played.log_records,
            describe(&played.challenger),
            describe(&played.opponent)
        )?;
    }
    Ok(())
}

fn describe(outcome: &MatchOutcome) -> String {
    match outcome {
        MatchOutcome::Exited(reason) => reason.describe().to_string(),
        MatchOutcome::Halted(reason) => format!("halted ({reason})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtime::ExitReason;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn bots_finish_every_match() {
        let args = SimulateArgs {
            matches: 2,
            rounds: 2,
            offense_only: true,
            poll_ms: 5,
        };

        let report = tokio::time::timeout(Duration::from_secs(10), simulate(&args))
            .await
            .expect("simulation did not finish")
            .unwrap();

        assert_eq!(report.len(), 2);
        assert_ne!(report[0].match_id, report[1].match_id);
        for played in &report {
            assert_eq!(played.rounds, 2);
            assert_eq!(played.challenger, MatchOutcome::Exited(ExitReason::GameOver));
            assert_eq!(played.opponent, MatchOutcome::Exited(ExitReason::GameOver));
            assert!(played.log_records > 0);
        }

        let mut out = Vec::new();
        print_report(&report, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
    }
}

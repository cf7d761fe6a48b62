//! Interactive console: matchmaking commands plus prompted play.
mod command;

pub use command::{CommandError, ReplCommand};

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use battle_core::{Address, MatchId, MoveCatalog, MoveKind, MoveRef, Phase};
use client_frontend_core::format::{describe_state, short_address};
use client_frontend_core::{Frontend, FrontendConfig, MessageConsumer};
use client_ledger_core::{Challenge, LedgerGateway};
use runtime::{
    EventBus, MoveProvider, MoveSubmitter, PendingCommitRepository, RetryPolicy, SessionConfig,
    SyncConfig, SyncContext, SyncHandle, SystemClock,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::config::CliConfig;
use crate::input::{MovePrompt, PromptMoveProvider};
use crate::presentation::ConsolePresenter;
use command::HELP;

/// Line-based frontend. Construct with [`Repl::new`], then hand it to the
/// binary as a [`Frontend`].
pub struct Repl {
    cli: CliConfig,
    frontend: FrontendConfig,
    session: SessionConfig,
    sync: SyncConfig,
    retry: RetryPolicy,
    catalog: MoveCatalog,
    store: Arc<dyn PendingCommitRepository>,
}

impl Repl {
    pub fn new(catalog: MoveCatalog, store: Arc<dyn PendingCommitRepository>) -> Self {
        Self {
            cli: CliConfig::default(),
            frontend: FrontendConfig::default(),
            session: SessionConfig::default(),
            sync: SyncConfig::default(),
            retry: RetryPolicy::default(),
            catalog,
            store,
        }
    }

    pub fn with_cli_config(mut self, cli: CliConfig) -> Self {
        self.cli = cli;
        self
    }

    pub fn with_frontend_config(mut self, frontend: FrontendConfig) -> Self {
        self.frontend = frontend;
        self
    }

    pub fn with_session_config(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn with_sync_config(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Builds the console state for `gateway` plus the channels it listens on.
    fn console(
        &self,
        gateway: Arc<dyn LedgerGateway>,
    ) -> (Console, mpsc::Receiver<MovePrompt>, mpsc::Receiver<MatchId>) {
        let me = gateway.participant();
        let (provider, prompts) = PromptMoveProvider::channel(1);
        let (ended_tx, ended_rx) = mpsc::channel(4);

        let submitter = Arc::new(MoveSubmitter::new(
            Arc::clone(&gateway),
            Arc::clone(&self.store),
            self.retry.clone(),
        ));
        let presenter = ConsolePresenter::new(MessageConsumer::new(
            self.catalog.clone(),
            Some(me),
            self.frontend.messages.clone(),
        ));

        let console = Console {
            gateway,
            me,
            submitter,
            provider: Arc::new(provider),
            presenter,
            catalog: self.catalog.clone(),
            frontend: self.frontend.clone(),
            session: self.session.clone(),
            sync: self.sync.clone(),
            status_messages: self.cli.status_messages,
            active: None,
            prompt: None,
            ended_tx,
        };
        (console, prompts, ended_rx)
    }
}

#[async_trait]
impl Frontend for Repl {
    async fn run(&mut self, gateway: Arc<dyn LedgerGateway>) -> Result<()> {
        let info = gateway.info();
        let (mut console, mut prompts, mut ended) = self.console(gateway);

        println!(
            "Connected to {} ({}) as {}",
            info.backend, info.network, info.participant
        );
        println!("Type `help` for commands.");
        if let Err(error) = console.resume(true).await {
            println!("! Could not look up your current match: {error}");
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut watch = interval(self.session.idle_interval);
        watch.set_missed_tick_behavior(MissedTickBehavior::Delay);
        print_prompt(&self.cli.prompt);

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("reading stdin")? else {
                        break;
                    };
                    match console.handle_line(&line).await {
                        Ok(Flow::Quit) => break,
                        Ok(Flow::Continue) => {}
                        Err(error) => println!("! {error:#}"),
                    }
                    print_prompt(&self.cli.prompt);
                }
                Some(prompt) = prompts.recv() => {
                    console.show_prompt(&prompt);
                    console.prompt = Some(prompt);
                    print_prompt(&self.cli.prompt);
                }
                Some(match_id) = ended.recv() => {
                    console.finish(match_id).await;
                    print_prompt(&self.cli.prompt);
                }
                _ = watch.tick() => {
                    if console.active.is_none()
                        && let Err(error) = console.resume(false).await
                    {
                        debug!(target: "cli::repl", %error, "Match lookup failed");
                    }
                }
            }
        }

        console.shutdown().await;
        println!("Bye.");
        Ok(())
    }
}

fn print_prompt(prompt: &str) {
    write_prompt(&mut std::io::stdout(), prompt);
}

/// Writes the prompt without a newline. A closed terminal is not fatal.
fn write_prompt(out: &mut impl std::io::Write, prompt: &str) {
    if let Err(error) = write!(out, "{prompt}").and_then(|()| out.flush()) {
        debug!(target: "cli::repl", %error, "Could not write prompt");
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct ActiveMatch {
    match_id: MatchId,
    handle: SyncHandle,
    worker: JoinHandle<()>,
    printers: Vec<JoinHandle<()>>,
}

struct Console {
    gateway: Arc<dyn LedgerGateway>,
    me: Address,
    submitter: Arc<MoveSubmitter>,
    provider: Arc<PromptMoveProvider>,
    presenter: ConsolePresenter,
    catalog: MoveCatalog,
    frontend: FrontendConfig,
    session: SessionConfig,
    sync: SyncConfig,
    status_messages: usize,
    active: Option<ActiveMatch>,
    prompt: Option<MovePrompt>,
    ended_tx: mpsc::Sender<MatchId>,
}

impl Console {
    async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        match ReplCommand::parse(line)? {
            Some(command) => self.execute(command).await,
            None => Ok(Flow::Continue),
        }
    }

    async fn execute(&mut self, command: ReplCommand) -> Result<Flow> {
        let mode = self.session.mode;

        match command {
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Quit => return Ok(Flow::Quit),
            ReplCommand::Moves => {
                for (index, (kind, _)) in self.choices().iter().enumerate() {
                    println!("  {}) {}", index + 1, kind.label());
                }
            }
            ReplCommand::Pick(index) => self.answer(index)?,
            ReplCommand::Queue => {
                self.ensure_idle()?;
                let team = self.session.team.pick();
                self.gateway.join_queue(mode, team).await?;
                info!(target: "cli::repl", %mode, units = ?team.units, "Joined queue");
                if !self.resume(false).await? {
                    println!("Queued in {mode}; waiting for an opponent.");
                }
            }
            ReplCommand::Leave => {
                self.gateway.leave_queue(mode).await?;
                println!("Left the {mode} queue.");
            }
            ReplCommand::Challenge(opponent) => {
                self.ensure_idle()?;
                let team = self.session.team.pick();
                self.gateway.challenge(mode, team, opponent).await?;
                println!("Challenged {}.", short_address(opponent));
            }
            ReplCommand::Accept(challenge_id) => {
                self.ensure_idle()?;
                let team = self.session.team.pick();
                let match_id = self.gateway.accept_challenge(challenge_id, team).await?;
                self.start(match_id);
            }
            ReplCommand::Reject(challenge_id) => {
                self.gateway.reject_challenge(challenge_id).await?;
                println!("Rejected challenge {}.", challenge_id.0);
            }
            ReplCommand::List => {
                let challenges = self.gateway.list_challenges(self.me, mode).await?;
                if challenges.is_empty() {
                    println!("No challenges in {mode}.");
                }
                for challenge in &challenges {
                    println!("  {}", self.describe_challenge(challenge));
                }
            }
            ReplCommand::Status => self.status().await?,
        }
        Ok(Flow::Continue)
    }

    fn ensure_idle(&self) -> Result<()> {
        match &self.active {
            Some(active) => Err(anyhow!("already playing {}", active.match_id)),
            None => Ok(()),
        }
    }

    fn choices(&self) -> Vec<(MoveKind, MoveRef)> {
        self.catalog.choices(false)
    }

    fn show_prompt(&self, prompt: &MovePrompt) {
        println!();
        println!(
            "Round {} of {}: choose your move",
            prompt.request.round, prompt.request.match_id
        );
        for (index, (kind, _)) in self.choices().iter().enumerate() {
            println!("  {}) {}", index + 1, kind.label());
        }
    }

    fn answer(&mut self, index: usize) -> Result<()> {
        let choices = self.choices();
        let Some((kind, mv)) = index.checked_sub(1).and_then(|i| choices.get(i)).copied() else {
            return Err(anyhow!("pick a number between 1 and {}", choices.len()));
        };
        let Some(prompt) = self.prompt.take() else {
            return Err(anyhow!("no move is being requested right now"));
        };

        if prompt.answer(mv) {
            println!("Playing {}.", kind.label());
        } else {
            println!("That round already moved on.");
        }
        Ok(())
    }

    /// Starts playing the match the ledger seats us in, if any.
    async fn resume(&mut self, announce: bool) -> Result<bool> {
        if self.active.is_some() {
            return Ok(true);
        }
        match self.gateway.get_match_by_participant(self.me).await? {
            Some(record) => {
                if announce {
                    println!("Resuming {} at round {}.", record.id, record.round);
                }
                self.start(record.id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn start(&mut self, match_id: MatchId) {
        let bus = EventBus::new();
        let topics = self.frontend.messages.visibility.topics();
        // Subscribe before spawning so the first events are printed.
        let printers = self
            .presenter
            .attach(&bus, &topics, match_id, self.ended_tx.clone());

        let provider: Arc<dyn MoveProvider> = self.provider.clone();
        let context = SyncContext {
            match_id,
            gateway: Arc::clone(&self.gateway),
            submitter: Arc::clone(&self.submitter),
            provider,
            bus,
            clock: Arc::new(SystemClock),
            config: self.sync.clone(),
        };
        let (handle, worker) = context.spawn(None);

        println!("Playing {match_id}.");
        info!(target: "cli::repl", %match_id, "Synchronizer started");
        self.active = Some(ActiveMatch {
            match_id,
            handle,
            worker,
            printers,
        });
    }

    async fn finish(&mut self, match_id: MatchId) {
        if self.active.as_ref().is_none_or(|active| active.match_id != match_id) {
            return;
        }
        self.stop_active().await;
        println!("Finished {match_id}. Type `queue` to play again.");
    }

    async fn stop_active(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        self.prompt = None;
        if let Err(error) = active.handle.shutdown().await {
            debug!(target: "cli::repl", match_id = %active.match_id, %error, "Synchronizer already stopped");
        }
        if let Err(error) = active.worker.await {
            warn!(target: "cli::repl", match_id = %active.match_id, %error, "Synchronizer task failed");
        }
        for printer in active.printers {
            printer.abort();
        }
    }

    async fn shutdown(&mut self) {
        self.stop_active().await;
    }

    async fn status(&self) -> Result<()> {
        let Some(active) = &self.active else {
            println!("Not in a match.");
            return Ok(());
        };

        let snapshot = active.handle.snapshot().await?;
        println!("{}: {}", snapshot.match_id, describe_state(snapshot.state));
        if let Some(record) = &snapshot.record {
            let phase = match record.phase {
                Phase::Commit => "commit",
                Phase::Reveal => "reveal",
                Phase::GameOver => "game over",
            };
            println!("  round {}, {phase} phase", record.round);
            if let Some(opponent) = record
                .participants
                .iter()
                .find(|participant| participant.identity != self.me)
            {
                println!("  opponent {}", short_address(opponent.identity));
            }
        }
        if let Some(pending) = snapshot.pending {
            println!(
                "  committed {} for round {}",
                self.catalog.move_label(pending.mv),
                pending.round
            );
        }
        for text in self.presenter.recent(self.status_messages) {
            println!("  | {text}");
        }
        Ok(())
    }

    fn describe_challenge(&self, challenge: &Challenge) -> String {
        let (direction, other) = if challenge.challenger == self.me {
            ("to", challenge.opponent)
        } else {
            ("from", challenge.challenger)
        };
        format!(
            "#{} {direction} {} ({:?})",
            challenge.id.0,
            short_address(other),
            challenge.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_core::{ChallengeMode, GameMode, Team};
    use client_ledger_core::{Matchmaking, MockLedger, MockOp};
    use runtime::{InMemoryPendingCommitRepository, TeamSelection};

    const ME: Address = Address::repeat_byte(0xaa);
    const THEM: Address = Address::repeat_byte(0xbb);

    struct ClosedTerminal(Vec<u8>);

    impl std::io::Write for ClosedTerminal {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn prompt_survives_a_failed_flush() {
        let mut out = ClosedTerminal(Vec::new());
        write_prompt(&mut out, "> ");
        write_prompt(&mut out, "> ");
        assert_eq!(out.0, b"> > ");
    }

    fn repl() -> Repl {
        Repl::new(
            MoveCatalog::synthetic(),
            Arc::new(InMemoryPendingCommitRepository::new()),
        )
        .with_session_config(SessionConfig {
            mode: GameMode(2),
            team: TeamSelection::Fixed(Team::new(1, 2)),
            ..SessionConfig::default()
        })
    }

    #[tokio::test]
    async fn queue_starts_playing_when_paired() {
        let ledger = MockLedger::new();
        ledger
            .client(THEM)
            .join_queue(GameMode(2), Team::new(3, 4))
            .await
            .unwrap();

        let repl = repl();
        let (mut console, mut prompts, _ended) = repl.console(Arc::new(ledger.client(ME)));
        assert_eq!(console.handle_line("queue").await.unwrap(), Flow::Continue);
        assert!(console.active.is_some());

        // The synchronizer asks for our first move.
        let prompt = prompts.recv().await.unwrap();
        assert_eq!(prompt.request.round, 0);
        console.prompt = Some(prompt);
        console.handle_line("1").await.unwrap();

        console.shutdown().await;
        assert!(console.active.is_none());
        assert_eq!(ledger.calls(MockOp::JoinQueue), 2);
    }

    #[tokio::test]
    async fn commands_need_an_idle_console_or_a_prompt() {
        let ledger = MockLedger::new();
        ledger.set_challenge_mode(GameMode(2), ChallengeMode::QueueAndChallenge);
        let repl = repl();
        let (mut console, _prompts, _ended) = repl.console(Arc::new(ledger.client(ME)));

        let error = console.handle_line("1").await.unwrap_err();
        assert!(error.to_string().contains("no move is being requested"));

        console.handle_line(&format!("challenge {THEM}")).await.unwrap();
        let challenges = ledger.challenges();
        assert_eq!(challenges.len(), 1);
        assert_eq!(challenges[0].opponent, THEM);

        assert_eq!(console.handle_line("quit").await.unwrap(), Flow::Quit);
    }
}

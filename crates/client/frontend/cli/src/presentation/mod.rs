//! Console output for runtime events.
//!
//! The presenter subscribes to the visible topics of a match's event bus,
//! formats each event through a [`MessageConsumer`] and prints the result.
//! It keeps the log so the REPL can show recent messages on demand.
use std::sync::{Arc, Mutex, PoisonError};

use battle_core::MatchId;
use client_frontend_core::{EventConsumer, MessageEntry, MessageLevel, MessageConsumer};
use runtime::{Event, EventBus, Topic};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct ConsolePresenter {
    consumer: Arc<Mutex<MessageConsumer>>,
}

impl ConsolePresenter {
    pub fn new(consumer: MessageConsumer) -> Self {
        Self {
            consumer: Arc::new(Mutex::new(consumer)),
        }
    }

    /// Most recent messages, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<String> {
        let consumer = self.consumer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut texts: Vec<_> = consumer
            .message_log()
            .recent(limit)
            .map(|entry| entry.text.clone())
            .collect();
        texts.reverse();
        texts
    }

    /// Prints events for `match_id` until aborted. Sends the match id on
    /// `ended` once its synchronizer exits or halts.
    pub fn attach(
        &self,
        bus: &EventBus,
        topics: &[Topic],
        match_id: MatchId,
        ended: mpsc::Sender<MatchId>,
    ) -> Vec<JoinHandle<()>> {
        bus.subscribe_multiple(topics)
            .into_values()
            .map(|rx| {
                let presenter = self.clone();
                let ended = ended.clone();
                tokio::spawn(presenter.pump(rx, match_id, ended))
            })
            .collect()
    }

    async fn pump(
        self,
        mut rx: broadcast::Receiver<Event>,
        match_id: MatchId,
        ended: mpsc::Sender<MatchId>,
    ) {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(target: "cli::presentation", skipped, "Console fell behind, events skipped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            let (impact, lines) = {
                let mut consumer = self.consumer.lock().unwrap_or_else(PoisonError::into_inner);
                let impact = consumer.on_event(&event);
                (impact, consumer.message_log_mut().take_unseen())
            };
            for entry in &lines {
                print_entry(entry);
            }

            if impact.match_ended {
                let _ = ended.send(match_id).await;
            }
        }
    }
}

pub fn print_entry(entry: &MessageEntry) {
    match entry.level {
        MessageLevel::Info => println!("  {}", entry.text),
        MessageLevel::Warning => println!("* {}", entry.text),
        MessageLevel::Error => println!("! {}", entry.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_core::MoveCatalog;
    use client_frontend_core::MessageConfig;
    use runtime::{ExitReason, LifecycleEvent};

    #[tokio::test]
    async fn reports_match_end_and_keeps_messages() {
        let bus = EventBus::new();
        let presenter = ConsolePresenter::new(MessageConsumer::new(
            MoveCatalog::synthetic(),
            None,
            MessageConfig::default(),
        ));
        let (ended_tx, mut ended_rx) = mpsc::channel(1);
        let tasks = presenter.attach(&bus, &[Topic::Lifecycle], MatchId(3), ended_tx);

        bus.publish(Event::Lifecycle(LifecycleEvent::Exited {
            match_id: MatchId(3),
            reason: ExitReason::GameOver,
        }));

        assert_eq!(ended_rx.recv().await, Some(MatchId(3)));
        assert_eq!(presenter.recent(5), ["Left match#3: game over"]);
        tasks.iter().for_each(JoinHandle::abort);
    }
}

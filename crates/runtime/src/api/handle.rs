//! Cloneable façade for issuing commands to a turn synchronizer.
//!
//! [`SyncHandle`] hides channel plumbing and offers async helpers for
//! triggering refreshes, reading state, and streaming events by topic.
use tokio::sync::{broadcast, mpsc, oneshot};

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::sync::{Command, SyncSnapshot, SyncState};

/// Client-facing handle to a running synchronizer
#[derive(Clone)]
pub struct SyncHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl SyncHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>, event_bus: EventBus) -> Self {
        Self {
            command_tx,
            event_bus,
        }
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)
    }

    /// Requests a refresh. Dropped if an operation for the match is in flight.
    pub async fn trigger(&self) -> Result<()> {
        self.send(Command::Trigger).await
    }

    pub async fn snapshot(&self) -> Result<SyncSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Snapshot { reply: reply_tx }).await?;
        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    pub async fn state(&self) -> Result<SyncState> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::State { reply: reply_tx }).await?;
        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Waits until no observation, submission or exit is in flight.
    pub async fn settle(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Settle { reply: reply_tx }).await?;
        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Stops the actor; in-flight ledger calls are detached.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Shutdown { reply: reply_tx }).await?;
        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Battle` - Damage, heals and status effects from the log
    /// - `Topic::Protocol` - Commits, reveals and game over from the log
    /// - `Topic::Turn` - Local move requests, submissions and state changes
    /// - `Topic::Lifecycle` - Exit and halt notifications
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}

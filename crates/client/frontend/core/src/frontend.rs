//! Trait describing a runnable client front-end.
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use client_ledger_core::LedgerGateway;

/// Frontend abstraction for UI layers.
///
/// A frontend receives the ledger gateway for the local participant and
/// drives acquisition and play itself, usually through a
/// `runtime::ParticipantSession` or a `runtime::SyncContext`.
///
/// # Implementations
///
/// - `Repl` in `client-frontend-cli`: line-based interactive console
#[async_trait]
pub trait Frontend: Send {
    /// Runs until the user quits.
    async fn run(&mut self, gateway: Arc<dyn LedgerGateway>) -> Result<()>;
}

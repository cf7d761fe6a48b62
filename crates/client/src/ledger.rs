//! Ledger connection from environment configuration.
use std::sync::Arc;

use anyhow::{Context, Result};
use battle_core::MoveCatalog;
use client_ledger_core::LedgerGateway;
use client_ledger_evm::{EvmConfig, EvmLedgerClient};
use runtime::{ProtocolMode, SyncConfig};
use tracing::info;

/// A checked gateway plus the deployment settings that shape play.
pub struct Connection {
    pub gateway: Arc<dyn LedgerGateway>,
    pub catalog: MoveCatalog,
    pub sync: SyncConfig,
}

/// Connects to the EVM ledger named by `LEDGER_*` variables and checks that
/// the node answers before anything is submitted.
pub async fn connect() -> Result<Connection> {
    let config = EvmConfig::from_env().context("loading ledger configuration")?;
    let client = EvmLedgerClient::connect(&config).context("creating ledger client")?;
    client
        .health_check()
        .await
        .with_context(|| format!("ledger at {} is not reachable", config.rpc_url))?;

    let ledger = client.info();
    info!(
        target: "client",
        backend = ledger.backend,
        network = %ledger.network,
        participant = %ledger.participant,
        "Ledger connected"
    );

    let mut sync = SyncConfig::from_env();
    if config.reveal_only {
        sync.protocol = ProtocolMode::RevealOnly;
    }

    Ok(Connection {
        gateway: Arc::new(client),
        catalog: config.catalog,
        sync,
    })
}

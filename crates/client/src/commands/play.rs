//! Interactive console.
use std::sync::Arc;

use anyhow::{Context, Result};
use client_frontend_cli::logging::setup_logging;
use client_frontend_cli::{CliConfig, FrontendConfig, Repl};
use client_frontend_core::Frontend;
use runtime::{FilePendingCommitRepository, RetryPolicy, SessionConfig};

use crate::ledger::connect;

pub async fn run(session_id: Option<&str>) -> Result<()> {
    // File logging only; stderr output would tear the prompt.
    let _guard = setup_logging(session_id, false)?;
    let connection = connect().await?;

    let session = SessionConfig::from_env();
    let store = FilePendingCommitRepository::new(&session.data_dir)
        .with_context(|| format!("opening commit store at {}", session.data_dir.display()))?;

    let mut repl = Repl::new(connection.catalog, Arc::new(store))
        .with_cli_config(CliConfig::from_env())
        .with_frontend_config(FrontendConfig::from_env())
        .with_session_config(session)
        .with_sync_config(connection.sync)
        .with_retry(RetryPolicy::from_env());

    repl.run(connection.gateway).await
}

//! EVM gateway configuration and deployment file.
//!
//! Environment variables:
//! - `LEDGER_RPC_URL` - JSON-RPC endpoint (required)
//! - `PARTICIPANT_ADDRESS` - account transactions are sent from (required)
//! - `MATCH_MAKER_ADDRESS` / `EVENT_LOGGER_ADDRESS` - contract addresses
//!   (required unless present in the deployment file)
//! - `LEDGER_GAS_LIMIT` - gas per transaction (default 5,000,000)
//! - `LEDGER_RECEIPT_TIMEOUT_MS` - receipt wait (default 30,000)
//! - `LEDGER_DEPLOYMENT_FILE` - optional TOML with addresses and move catalog

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::Address;
use battle_core::MoveCatalog;
use serde::Deserialize;

use crate::error::{Result, RpcError};

const DEFAULT_GAS_LIMIT: u64 = 5_000_000;
const DEFAULT_RECEIPT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Deployed contract addresses and the move catalog.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeploymentInfo {
    /// Network label, e.g. `"sepolia"` or `"local"`.
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub match_maker: Option<Address>,
    #[serde(default)]
    pub event_logger: Option<Address>,
    /// Whether the match maker is the reveal-only variant.
    #[serde(default)]
    pub reveal_only: bool,
    #[serde(default)]
    pub catalog: MoveCatalog,
}

impl DeploymentInfo {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RpcError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| RpcError::InvalidConfig(format!("deployment file: {e}")))
    }
}

/// Connection settings for [`crate::EvmLedgerClient`].
#[derive(Debug, Clone)]
pub struct EvmConfig {
    pub rpc_url: String,
    pub network: String,
    pub participant: Address,
    pub match_maker: Address,
    pub event_logger: Address,
    pub reveal_only: bool,
    pub gas_limit: u64,
    pub receipt_timeout: Duration,
    pub request_timeout: Duration,
    pub catalog: MoveCatalog,
}

impl EvmConfig {
    /// Load configuration from environment variables and the optional
    /// deployment file. Environment values win over the file.
    pub fn from_env() -> Result<Self> {
        let deployment = match std::env::var("LEDGER_DEPLOYMENT_FILE") {
            Ok(path) => DeploymentInfo::load(&PathBuf::from(path))?,
            Err(_) => DeploymentInfo::default(),
        };

        let rpc_url = std::env::var("LEDGER_RPC_URL")
            .map_err(|_| RpcError::InvalidConfig("LEDGER_RPC_URL is not set".into()))?;
        let participant = required_address("PARTICIPANT_ADDRESS", None)?;
        let match_maker = required_address("MATCH_MAKER_ADDRESS", deployment.match_maker)?;
        let event_logger = required_address("EVENT_LOGGER_ADDRESS", deployment.event_logger)?;

        let config = Self {
            network: deployment.network.unwrap_or_else(|| rpc_url.clone()),
            rpc_url,
            participant,
            match_maker,
            event_logger,
            reveal_only: read_env("SYNC_REVEAL_ONLY").unwrap_or(deployment.reveal_only),
            gas_limit: read_env("LEDGER_GAS_LIMIT").unwrap_or(DEFAULT_GAS_LIMIT),
            receipt_timeout: Duration::from_millis(
                read_env("LEDGER_RECEIPT_TIMEOUT_MS").unwrap_or(DEFAULT_RECEIPT_TIMEOUT_MS),
            ),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            catalog: deployment.catalog,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.participant == Address::ZERO {
            return Err(RpcError::InvalidConfig(
                "participant address must not be zero".into(),
            ));
        }
        if self.gas_limit == 0 {
            return Err(RpcError::InvalidConfig("gas limit must be positive".into()));
        }
        if !self.rpc_url.starts_with("http://") && !self.rpc_url.starts_with("https://") {
            return Err(RpcError::InvalidConfig(format!(
                "unsupported RPC url {}",
                self.rpc_url
            )));
        }
        Ok(())
    }
}

fn read_env<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.parse().ok())
}

fn required_address(key: &str, fallback: Option<Address>) -> Result<Address> {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|e| RpcError::InvalidConfig(format!("{key}: {e}"))),
        Err(_) => fallback.ok_or_else(|| RpcError::InvalidConfig(format!("{key} is not set"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_core::MoveKind;

    const DEPLOYMENT: &str = r#"
network = "sepolia"
match_maker = "0x1111111111111111111111111111111111111111"
event_logger = "0x2222222222222222222222222222222222222222"

[catalog.moves]
ControlMove = "0x00000000000000000000000000000000000000a1"
HealMove = "0x00000000000000000000000000000000000000a2"

[catalog.effects]
"Debuff: Fogged" = "0x00000000000000000000000000000000000000b1"
"#;

    #[test]
    fn deployment_file_parses() {
        let info = DeploymentInfo::parse(DEPLOYMENT).unwrap();
        assert_eq!(info.network.as_deref(), Some("sepolia"));
        assert_eq!(info.match_maker, Some(Address::repeat_byte(0x11)));
        assert!(!info.reveal_only);
        assert_eq!(info.catalog.moves.len(), 2);
        assert!(info.catalog.move_ref(MoveKind::HealMove).is_some());
        assert_eq!(info.catalog.effects.len(), 1);
    }

    #[test]
    fn deployment_file_loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployment.toml");
        std::fs::write(&path, DEPLOYMENT).unwrap();
        let info = DeploymentInfo::load(&path).unwrap();
        assert_eq!(info.event_logger, Some(Address::repeat_byte(0x22)));
    }

    #[test]
    fn validation_rejects_bad_urls() {
        let config = EvmConfig {
            rpc_url: "ws://localhost:8546".into(),
            network: "local".into(),
            participant: Address::repeat_byte(1),
            match_maker: Address::repeat_byte(2),
            event_logger: Address::repeat_byte(3),
            reveal_only: false,
            gas_limit: DEFAULT_GAS_LIMIT,
            receipt_timeout: Duration::from_secs(1),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            catalog: MoveCatalog::default(),
        };
        assert!(config.validate().is_err());
        assert!(
            EvmConfig {
                rpc_url: "http://127.0.0.1:8545".into(),
                ..config
            }
            .validate()
            .is_ok()
        );
    }
}

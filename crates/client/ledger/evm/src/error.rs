//! Error types for JSON-RPC access to an EVM node.

use alloy_primitives::B256;
use alloy_sol_types::{Revert, SolError};
use client_ledger_core::{LedgerError, TransportError};
use thiserror::Error;

/// Geth reports reverted calls with this error code.
const EXECUTION_REVERTED: i64 = 3;

/// Errors raised while talking to the node.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Node error {code}: {message}")]
    Node {
        code: i64,
        message: String,
        /// Hex-encoded revert payload, when the node supplies one.
        data: Option<String>,
    },

    #[error("Empty result for {0}")]
    EmptyResult(&'static str),

    #[error("Malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("No receipt for {tx_hash} after {waited_ms} ms")]
    ReceiptTimeout { tx_hash: B256, waited_ms: u64 },

    #[error("Transaction {0} reverted")]
    Reverted(B256),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, RpcError>;

/// Extracts the reason string from an `Error(string)` revert payload.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    Revert::abi_decode(data, true).ok().map(|revert| revert.reason)
}

fn revert_reason_from_hex(data: &str) -> Option<String> {
    let digits = data.strip_prefix("0x").unwrap_or(data);
    let bytes = alloy_primitives::hex::decode(digits).ok()?;
    decode_revert_reason(&bytes)
}

impl RpcError {
    /// Revert reason carried by this error, if the node reported a revert.
    pub fn revert_reason(&self) -> Option<String> {
        let RpcError::Node {
            code,
            message,
            data,
        } = self
        else {
            return None;
        };

        if let Some(reason) = data.as_deref().and_then(revert_reason_from_hex) {
            return Some(reason);
        }
        if *code == EXECUTION_REVERTED || message.contains("revert") {
            return Some(message.clone());
        }
        None
    }
}

impl From<RpcError> for LedgerError {
    fn from(err: RpcError) -> Self {
        if let Some(reason) = err.revert_reason() {
            return LedgerError::rejected(reason);
        }
        match err {
            RpcError::Http(e) if e.is_timeout() => {
                LedgerError::Transport(TransportError::Network(format!("timeout: {e}")))
            }
            RpcError::Http(e) => LedgerError::Transport(TransportError::Network(e.to_string())),
            RpcError::Node { code, message, .. } => {
                LedgerError::Transport(TransportError::Rpc { code, message })
            }
            RpcError::EmptyResult(method) => LedgerError::InvalidData(format!(
                "node returned no result for {method}"
            )),
            RpcError::Malformed(e) => {
                LedgerError::Transport(TransportError::Serialization(e.to_string()))
            }
            RpcError::ReceiptTimeout { waited_ms, .. } => {
                LedgerError::Transport(TransportError::Timeout(waited_ms))
            }
            RpcError::Reverted(tx_hash) => {
                LedgerError::rejected(format!("transaction {tx_hash} reverted"))
            }
            RpcError::InvalidConfig(message) => {
                LedgerError::Transport(TransportError::Config(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_ledger_core::RejectionReason;

    fn revert_hex(reason: &str) -> String {
        let payload = Revert {
            reason: reason.to_string(),
        }
        .abi_encode();
        format!("0x{}", alloy_primitives::hex::encode(payload))
    }

    #[test]
    fn revert_payload_becomes_rejection() {
        let err = RpcError::Node {
            code: EXECUTION_REVERTED,
            message: "execution reverted".into(),
            data: Some(revert_hex("MatchMakerV2: not in reveal phase")),
        };
        let ledger: LedgerError = err.into();
        assert_eq!(
            ledger.rejection().map(|r| r.reason.clone()),
            Some(RejectionReason::NotInRevealPhase)
        );
    }

    #[test]
    fn revert_without_payload_uses_message() {
        let err = RpcError::Node {
            code: -32603,
            message: "VM Exception while processing transaction: reverted with reason string 'MatchMakerV2: game over'".into(),
            data: None,
        };
        let ledger: LedgerError = err.into();
        assert_eq!(
            ledger.rejection().map(|r| r.reason.clone()),
            Some(RejectionReason::GameOver)
        );
    }

    #[test]
    fn other_node_errors_are_transient() {
        let err = RpcError::Node {
            code: -32000,
            message: "header not found".into(),
            data: None,
        };
        assert!(LedgerError::from(err).is_transient());

        let timeout = RpcError::ReceiptTimeout {
            tx_hash: B256::ZERO,
            waited_ms: 30_000,
        };
        assert!(LedgerError::from(timeout).is_transient());
    }
}

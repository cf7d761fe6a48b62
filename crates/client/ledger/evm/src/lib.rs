//! EVM ledger integration for battle clients.
//!
//! This crate talks to the deployed match maker and event logger contracts
//! over plain JSON-RPC:
//! - ABI encoding of calls and return values via `alloy-sol-types`
//! - Revert reasons decoded from `Error(string)` payloads and classified
//!   into `RejectionReason` at this boundary
//! - Write calls simulated before they are sent
//!
//! # Architecture
//!
//! ```text
//! runtime (LedgerGateway) → EvmLedgerClient → LedgerTransport → node
//!                                ↓
//!                       sol! call encoding
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use client_ledger_evm::{EvmConfig, EvmLedgerClient};
//!
//! let config = EvmConfig::from_env()?;
//! let ledger = EvmLedgerClient::connect(&config)?;
//! let current = ledger.get_match_by_participant(config.participant).await?;
//! ```

pub mod client;
pub mod config;
pub mod contracts;
pub mod error;
pub mod transport;

pub use client::EvmLedgerClient;
pub use config::{DeploymentInfo, EvmConfig};
pub use error::{RpcError, decode_revert_reason};
pub use transport::JsonRpcTransport;

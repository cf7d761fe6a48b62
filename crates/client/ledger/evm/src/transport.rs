//! Minimal Ethereum JSON-RPC transport.
//!
//! Transactions are sent with `eth_sendTransaction` from an account the node
//! manages (a dev node or a signing proxy). Every write is simulated with
//! `eth_call` first so reverts surface with their reason string and nothing
//! is broadcast.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, B256, Bytes, U64};
use async_trait::async_trait;
use client_ledger_core::{LedgerTransport, Receipt, Result as LedgerResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::EvmConfig;
use crate::error::{Result, RpcError};

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    transaction_hash: B256,
    block_number: Option<U64>,
    status: Option<U64>,
}

/// JSON-RPC transport over HTTP.
pub struct JsonRpcTransport {
    http: reqwest::Client,
    url: String,
    sender: Address,
    gas_limit: u64,
    receipt_timeout: Duration,
    next_id: AtomicU64,
}

impl JsonRpcTransport {
    pub fn new(config: &EvmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            url: config.rpc_url.clone(),
            sender: config.participant,
            gas_limit: config.gas_limit,
            receipt_timeout: config.receipt_timeout,
            next_id: AtomicU64::new(1),
        })
    }

    async fn request<R: DeserializeOwned>(&self, method: &'static str, params: Value) -> Result<R> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        tracing::trace!(target: "ledger::evm", method, id, "RPC request");
        let response: RpcResponse<R> = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            let data = error.data.map(|value| match value {
                Value::String(text) => text,
                other => other.to_string(),
            });
            return Err(RpcError::Node {
                code: error.code,
                message: error.message,
                data,
            });
        }
        response.result.ok_or(RpcError::EmptyResult(method))
    }

    fn call_params(&self, to: Address, data: &[u8]) -> Value {
        json!([
            {
                "from": self.sender,
                "to": to,
                "data": Bytes::copy_from_slice(data),
            },
            "latest"
        ])
    }

    async fn eth_call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>> {
        let result: Bytes = self.request("eth_call", self.call_params(to, data)).await?;
        Ok(result.to_vec())
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TransactionReceipt> {
        let started = tokio::time::Instant::now();
        loop {
            let receipt: Option<TransactionReceipt> = match self
                .request("eth_getTransactionReceipt", json!([tx_hash]))
                .await
            {
                Ok(receipt) => Some(receipt),
                Err(RpcError::EmptyResult(_)) => None,
                Err(e) => return Err(e),
            };
            if let Some(receipt) = receipt {
                return Ok(receipt);
            }

            if started.elapsed() >= self.receipt_timeout {
                return Err(RpcError::ReceiptTimeout {
                    tx_hash,
                    waited_ms: self.receipt_timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }

    async fn send_transaction(&self, to: Address, data: &[u8]) -> Result<Receipt> {
        // Simulate first; a revert here carries the reason string.
        self.eth_call(to, data).await?;

        let tx = json!([{
            "from": self.sender,
            "to": to,
            "data": Bytes::copy_from_slice(data),
            "gas": U64::from(self.gas_limit),
        }]);
        let tx_hash: B256 = self.request("eth_sendTransaction", tx).await?;
        tracing::debug!(target: "ledger::evm", %tx_hash, %to, "Transaction sent");

        let receipt = self.wait_for_receipt(tx_hash).await?;
        if receipt.status.is_some_and(|status| status == U64::ZERO) {
            return Err(RpcError::Reverted(receipt.transaction_hash));
        }
        Ok(Receipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.map(|n| n.to::<u64>()),
        })
    }
}

#[async_trait]
impl LedgerTransport for JsonRpcTransport {
    async fn call(&self, to: Address, data: Vec<u8>) -> LedgerResult<Vec<u8>> {
        Ok(self.eth_call(to, &data).await?)
    }

    async fn send(&self, to: Address, data: Vec<u8>) -> LedgerResult<Receipt> {
        Ok(self.send_transaction(to, &data).await?)
    }

    fn sender(&self) -> Address {
        self.sender
    }

    async fn health_check(&self) -> LedgerResult<()> {
        let chain_id: U64 = self.request("eth_chainId", json!([])).await?;
        tracing::debug!(target: "ledger::evm", chain_id = chain_id.to::<u64>(), "Node reachable");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_fields_deserialize_from_node_json() {
        let raw = r#"{
            "transactionHash": "0x00000000000000000000000000000000000000000000000000000000000000aa",
            "blockNumber": "0x1b4",
            "status": "0x1"
        }"#;
        let receipt: TransactionReceipt = serde_json::from_str(raw).unwrap();
        assert_eq!(receipt.block_number.map(|n| n.to::<u64>()), Some(436));
        assert_eq!(receipt.status, Some(U64::from(1)));
    }

    #[test]
    fn error_responses_keep_revert_data() {
        let raw = r#"{
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": 3, "message": "execution reverted", "data": "0x08c379a0" }
        }"#;
        let response: RpcResponse<Bytes> = serde_json::from_str(raw).unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, 3);
        assert_eq!(error.data, Some(Value::String("0x08c379a0".into())));
        assert!(response.result.is_none());
    }
}

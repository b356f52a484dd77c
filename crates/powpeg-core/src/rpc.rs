//! Rootstock JSON-RPC access: node queries and bridge precompile calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chain_rsk::bridge;
use chain_rsk::chains::BRIDGE_ADDRESS;
use chain_rsk::transaction::RskTransaction;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::PowPegConfig;
use crate::error::{PowPegError, Result};
use crate::traits::{BridgeContract, ChainRpcProvider};

/// Minimal JSON-RPC 2.0 client for a Rootstock node.
pub struct JsonRpcProvider {
    url: String,
    client: Client,
    next_id: AtomicU64,
}

#[derive(Serialize)]
struct Request<'a> {
    jsonrpc: &'a str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct Envelope {
    result: Option<Value>,
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: i64,
    message: String,
}

impl JsonRpcProvider {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PowPegError::Config(format!("http client: {e}")))?;
        Ok(Self {
            url: url.to_string(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn from_config(config: &PowPegConfig) -> Result<Self> {
        Self::new(config.rpc_url(), config.call_timeout())
    }

    /// Call `method` and return its raw `result`.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = Request {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!(method, "json-rpc call");

        let response = self.client.post(&self.url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let payload: Option<Value> = response.json().await.ok();
            return Err(PowPegError::Api {
                message: format!("{method} failed"),
                status: Some(status.as_u16()),
                payload,
            });
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| PowPegError::api(format!("{method}: invalid response body: {e}")))?;
        if let Some(err) = envelope.error {
            return Err(PowPegError::Api {
                message: format!("{method}: {}", err.message),
                status: None,
                payload: Some(json!({ "code": err.code, "message": err.message })),
            });
        }
        envelope
            .result
            .ok_or_else(|| PowPegError::api(format!("{method}: missing result")))
    }

    async fn call_quantity(&self, method: &str, params: Value) -> Result<u128> {
        let result = self.call(method, params).await?;
        parse_quantity(&result).map_err(|e| PowPegError::api(format!("{method}: {e}")))
    }

    /// `eth_call` returning the decoded `0x` data.
    pub async fn eth_call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>> {
        let params = json!([{ "to": to, "data": format!("0x{}", hex::encode(data)) }, "latest"]);
        let result = self.call("eth_call", params).await?;
        let text = result
            .as_str()
            .ok_or_else(|| PowPegError::api("eth_call: result is not a string"))?;
        hex::decode(text.trim_start_matches("0x"))
            .map_err(|e| PowPegError::api(format!("eth_call: invalid hex result: {e}")))
    }
}

/// Parse a JSON-RPC hex quantity such as `"0x5208"`.
pub fn parse_quantity(value: &Value) -> std::result::Result<u128, String> {
    let text = value
        .as_str()
        .ok_or_else(|| format!("expected hex quantity, got {value}"))?;
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| format!("quantity {text:?} lacks 0x prefix"))?;
    if digits.is_empty() {
        return Err(format!("empty quantity {text:?}"));
    }
    u128::from_str_radix(digits, 16).map_err(|e| format!("invalid quantity {text:?}: {e}"))
}

fn to_quantity(value: u128) -> String {
    format!("0x{value:x}")
}

#[async_trait]
impl ChainRpcProvider for JsonRpcProvider {
    async fn get_balance(&self, address: &str) -> Result<u128> {
        self.call_quantity("eth_getBalance", json!([address, "latest"])).await
    }

    async fn estimate_gas(&self, transaction: &RskTransaction, from: &str) -> Result<u64> {
        let mut call = json!({
            "from": from,
            "to": transaction.to,
            "value": to_quantity(transaction.value),
        });
        if !transaction.data.is_empty() {
            call["data"] = json!(format!("0x{}", hex::encode(&transaction.data)));
        }
        let gas = self.call_quantity("eth_estimateGas", json!([call])).await?;
        u64::try_from(gas).map_err(|_| PowPegError::api(format!("eth_estimateGas: {gas} out of range")))
    }

    async fn get_gas_price(&self) -> Result<u128> {
        self.call_quantity("eth_gasPrice", json!([])).await
    }

    async fn get_transaction_count(&self, address: &str) -> Result<u64> {
        let count = self
            .call_quantity("eth_getTransactionCount", json!([address, "pending"]))
            .await?;
        u64::try_from(count)
            .map_err(|_| PowPegError::api(format!("eth_getTransactionCount: {count} out of range")))
    }
}

/// Bridge precompile reads over `eth_call`.
pub struct RpcBridge {
    provider: Arc<JsonRpcProvider>,
}

impl RpcBridge {
    pub fn new(provider: Arc<JsonRpcProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl BridgeContract for RpcBridge {
    async fn get_federation_address(&self) -> Result<String> {
        let data = self
            .provider
            .eth_call(BRIDGE_ADDRESS, &bridge::encode_get_federation_address())
            .await?;
        Ok(bridge::decode_federation_address(&data)?)
    }

    async fn get_pegout_estimated_fee(&self) -> Result<u64> {
        let fees_call = bridge::encode_get_estimated_pegout_fees();
        let count_call = bridge::encode_get_queued_pegouts_count();
        let (estimated, queued) = futures::try_join!(
            self.provider.eth_call(BRIDGE_ADDRESS, &fees_call),
            self.provider.eth_call(BRIDGE_ADDRESS, &count_call),
        )?;
        let estimated = bridge::decode_sat_amount(&estimated)?;
        let queued = bridge::decode_sat_amount(&queued)?;
        Ok(bridge::pegout_fee_share(estimated, queued))
    }
}

//! REST client for the two-way-peg API.
//!
//! Endpoints used:
//! - GET  /estimate-fee/{blocks}
//! - GET  /tx?tx={txid}
//! - POST /utxo
//! - POST /addresses-info
//! - POST /broadcast
//! - GET  /tx-status-by-type/{hash}/{PEGIN|PEGOUT}

use std::time::Duration;

use async_trait::async_trait;
use bitcoin::{Amount, Denomination};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::PowPegConfig;
use crate::error::{PowPegError, Result};
use crate::traits::BitcoinDataSource;
use crate::types::{AddressWithDetails, FeeLevel, TxStatus, TxType, Utxo};

#[derive(Clone)]
pub struct ApiService {
    base_url: String,
    client: Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddressListRequest<'a> {
    address_list: [&'a str; 1],
}

#[derive(Deserialize)]
struct FeeResponse {
    amount: Value,
}

#[derive(Deserialize)]
struct TxHexResponse {
    hex: String,
}

#[derive(Deserialize)]
struct UtxoResponse {
    data: Vec<UtxoEntry>,
}

#[derive(Deserialize)]
struct UtxoEntry {
    address: String,
    txid: String,
    vout: u32,
    satoshis: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressesInfoResponse {
    addresses_info: Vec<AddressInfoEntry>,
}

#[derive(Deserialize)]
struct AddressInfoEntry {
    address: String,
    balance: u64,
    txs: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BroadcastResponse {
    tx_id: String,
}

impl ApiService {
    /// Client for `base_url` (e.g. `https://api.2wp.testnet.rootstock.io`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PowPegError::Config(format!("http client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &PowPegConfig) -> Result<Self> {
        Self::new(config.api_url(), config.call_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Status of a peg transaction, identified by its hash and direction.
    pub async fn get_transaction_status(&self, tx_hash: &str, tx_type: TxType) -> Result<TxStatus> {
        let details: Value = self
            .get(&format!("/tx-status-by-type/{tx_hash}/{tx_type}"))
            .await?;

        let reported = details.get("type").and_then(Value::as_str).unwrap_or_default();
        let tx_type = TxType::parse(reported).ok_or_else(|| PowPegError::Api {
            message: format!("Transaction has invalid type {reported:?}"),
            status: None,
            payload: Some(details.clone()),
        })?;
        Ok(TxStatus { tx_type, details })
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        debug!(path, "GET");
        let response = self.client.get(format!("{}{path}", self.base_url)).send().await?;
        read_json(response).await
    }

    async fn post<B: Serialize + Sync, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        debug!(path, "POST");
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await?;
        read_json(response).await
    }
}

/// Decode a success body, or turn an error status into
/// [`PowPegError::Api`] carrying the server's message and body.
async fn read_json<R: DeserializeOwned>(response: Response) -> Result<R> {
    let status = response.status();
    if !status.is_success() {
        let payload: Option<Value> = response.json().await.ok();
        let message = payload
            .as_ref()
            .and_then(|body| body.get("message"))
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or("Server error")
            .to_string();
        return Err(PowPegError::Api {
            message,
            status: Some(status.as_u16()),
            payload,
        });
    }
    response
        .json()
        .await
        .map_err(|e| PowPegError::api(format!("Invalid response body: {e}")))
}

/// BTC/kB, as a decimal string or JSON number, to whole sat/byte.
pub fn btc_per_kb_to_sat_per_byte(amount: &Value) -> Result<u64> {
    let text = match amount {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => expand_exponent(&number.to_string())
            .ok_or_else(|| PowPegError::api(format!("Invalid fee amount {number}")))?,
        other => return Err(PowPegError::api(format!("Invalid fee amount {other}"))),
    };
    let per_kb = Amount::from_str_in(&text, Denomination::Bitcoin)
        .map_err(|e| PowPegError::api(format!("Invalid fee amount {text:?}: {e}")))?;
    Ok(per_kb.to_sat() / 1000)
}

/// Rewrite `1e-5` style JSON numbers as plain decimals, digit by digit.
fn expand_exponent(text: &str) -> Option<String> {
    let Some((mantissa, exponent)) = text.split_once(['e', 'E']) else {
        return Some(text.to_string());
    };
    let exponent: i64 = exponent.parse().ok()?;
    if exponent.abs() > 30 {
        return None;
    }
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{int_part}{frac_part}");
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let point = int_part.len() as i64 + exponent;
    let len = digits.len() as i64;
    Some(if point <= 0 {
        format!("0.{}{digits}", "0".repeat((-point) as usize))
    } else if point >= len {
        format!("{digits}{}", "0".repeat((point - len) as usize))
    } else {
        let (int_digits, frac_digits) = digits.split_at(point as usize);
        format!("{int_digits}.{frac_digits}")
    })
}

#[async_trait]
impl BitcoinDataSource for ApiService {
    async fn get_fee_rate(&self, level: FeeLevel) -> Result<u64> {
        let response: FeeResponse = self
            .get(&format!("/estimate-fee/{}", level.target_blocks()))
            .await?;
        btc_per_kb_to_sat_per_byte(&response.amount)
    }

    async fn get_tx_hex(&self, txid: &str) -> Result<String> {
        let response: TxHexResponse = self.get(&format!("/tx?tx={txid}")).await?;
        Ok(response.hex)
    }

    async fn get_outputs(&self, address: &str) -> Result<Vec<Utxo>> {
        let body = AddressListRequest {
            address_list: [address],
        };
        let response: UtxoResponse = self.post("/utxo", &body).await?;
        Ok(response
            .data
            .into_iter()
            .map(|entry| Utxo {
                address: entry.address,
                txid: entry.txid,
                vout: entry.vout,
                amount_sat: entry.satoshis,
            })
            .collect())
    }

    async fn get_address_details(&self, address: &str) -> Result<AddressWithDetails> {
        let body = AddressListRequest {
            address_list: [address],
        };
        let response: AddressesInfoResponse = self.post("/addresses-info", &body).await?;
        let entry = response
            .addresses_info
            .into_iter()
            .next()
            .ok_or_else(|| PowPegError::api(format!("No address info returned for {address}")))?;
        Ok(AddressWithDetails {
            address: entry.address,
            balance: entry.balance,
            tx_count: entry.txs,
        })
    }

    async fn broadcast(&self, signed_hex: &str) -> Result<String> {
        let response: BroadcastResponse = self
            .post("/broadcast", &serde_json::json!({ "data": signed_hex }))
            .await?;
        Ok(response.tx_id)
    }
}

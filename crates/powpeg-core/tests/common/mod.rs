//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{Secp256k1, SecretKey};
use bitcoin::transaction::Version;
use bitcoin::{
    Amount, CompressedPublicKey, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid,
    Witness,
};
use chain_btc::address::{parse_address, pubkey_to_address, AddressType};
use chain_btc::network::BtcNetwork;
use chain_btc::transaction::PeginTransaction;
use chain_rsk::transaction::RskTransaction;
use powpeg_core::error::Result;
use powpeg_core::traits::{BitcoinDataSource, BitcoinSigner, BridgeContract, ChainRpcProvider};
use powpeg_core::types::{AddressWithDetails, FeeLevel, Utxo};

pub const RECIPIENT: &str = "0x8c2f0abf2b1c4d4f7f5b6e3c3f2a6b7f7c7c1d9d";

/// Testnet address of the key `[seed; 32]`.
pub fn test_address(seed: u8, address_type: AddressType) -> String {
    let secp = Secp256k1::new();
    let secret = SecretKey::from_slice(&[seed; 32]).unwrap();
    let pubkey = CompressedPublicKey(secret.public_key(&secp));
    pubkey_to_address(&pubkey, address_type, BtcNetwork::Testnet)
}

/// A previous transaction paying `amount_sat` to `address` at output 0.
/// `salt` keeps txids distinct.
pub fn funding_tx(address: &str, amount_sat: u64, salt: u8) -> (Utxo, String) {
    let script_pubkey = parse_address(address, BtcNetwork::Testnet).unwrap().script_pubkey();
    let tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::new(Txid::from_byte_array([salt; 32]), 0),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::default(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(amount_sat),
            script_pubkey,
        }],
    };
    let utxo = Utxo {
        address: address.to_string(),
        txid: tx.compute_txid().to_string(),
        vout: 0,
        amount_sat,
    };
    (utxo, bitcoin::consensus::encode::serialize_hex(&tx))
}

pub struct MockDataSource {
    pub fee_rate: u64,
    pub fee_delay: Option<Duration>,
    details: Mutex<HashMap<String, AddressWithDetails>>,
    utxos: Mutex<HashMap<String, Vec<Utxo>>>,
    raw_txs: Mutex<HashMap<String, String>>,
    pub broadcasts: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
}

impl MockDataSource {
    pub fn new(fee_rate: u64) -> Self {
        Self {
            fee_rate,
            fee_delay: None,
            details: Mutex::new(HashMap::new()),
            utxos: Mutex::new(HashMap::new()),
            raw_txs: Mutex::new(HashMap::new()),
            broadcasts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Give `address` a confirmed output of `amount_sat`.
    pub fn fund(&self, address: &str, amount_sat: u64, salt: u8) -> Utxo {
        let (utxo, raw) = funding_tx(address, amount_sat, salt);
        self.raw_txs.lock().unwrap().insert(utxo.txid.clone(), raw);
        self.utxos
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_default()
            .push(utxo.clone());

        let mut details = self.details.lock().unwrap();
        let entry = details
            .entry(address.to_string())
            .or_insert_with(|| AddressWithDetails {
                address: address.to_string(),
                balance: 0,
                tx_count: 0,
            });
        entry.balance += amount_sat;
        entry.tx_count += 1;
        utxo
    }

    /// Record history for `address` without leaving it a balance.
    pub fn mark_used(&self, address: &str) {
        self.details.lock().unwrap().insert(
            address.to_string(),
            AddressWithDetails {
                address: address.to_string(),
                balance: 0,
                tx_count: 2,
            },
        );
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BitcoinDataSource for MockDataSource {
    async fn get_fee_rate(&self, _level: FeeLevel) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.fee_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.fee_rate)
    }

    async fn get_tx_hex(&self, txid: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.raw_txs
            .lock()
            .unwrap()
            .get(txid)
            .cloned()
            .ok_or_else(|| powpeg_core::PowPegError::Api {
                message: "Transaction not found".into(),
                status: Some(404),
                payload: None,
            })
    }

    async fn get_outputs(&self, address: &str) -> Result<Vec<Utxo>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.utxos.lock().unwrap().get(address).cloned().unwrap_or_default())
    }

    async fn get_address_details(&self, address: &str) -> Result<AddressWithDetails> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .details
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_else(|| AddressWithDetails {
                address: address.to_string(),
                balance: 0,
                tx_count: 0,
            }))
    }

    async fn broadcast(&self, signed_hex: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.broadcasts.lock().unwrap().push(signed_hex.to_string());
        Ok(format!("txid-{}", self.broadcasts.lock().unwrap().len()))
    }
}

/// Signer handing out fixed address lists.
pub struct MockSigner {
    pub receive: Vec<String>,
    pub change: Vec<String>,
    pub signed: Mutex<Vec<Vec<Utxo>>>,
    pub calls: AtomicUsize,
}

impl MockSigner {
    pub fn new(receive: Vec<String>, change: Vec<String>) -> Self {
        Self {
            receive,
            change,
            signed: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BitcoinSigner for MockSigner {
    async fn get_non_change_addresses(&self, count: usize) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.receive.iter().take(count).cloned().collect())
    }

    async fn get_change_addresses(&self, count: usize) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.change.iter().take(count).cloned().collect())
    }

    async fn sign_transaction(
        &self,
        transaction: &PeginTransaction,
        inputs: &[Utxo],
        _raw_transactions: &[String],
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.signed.lock().unwrap().push(inputs.to_vec());
        Ok(transaction.unsigned_hex())
    }
}

pub struct MockBridge {
    pub federation_address: String,
    pub pegout_fee_sat: u64,
}

impl MockBridge {
    pub fn new() -> Self {
        Self {
            federation_address: test_address(200, AddressType::Segwit),
            pegout_fee_sat: 14_000,
        }
    }
}

#[async_trait]
impl BridgeContract for MockBridge {
    async fn get_federation_address(&self) -> Result<String> {
        Ok(self.federation_address.clone())
    }

    async fn get_pegout_estimated_fee(&self) -> Result<u64> {
        Ok(self.pegout_fee_sat)
    }
}

pub struct MockRpc {
    pub balance_wei: u128,
    pub gas: u64,
    pub gas_price_wei: u128,
    pub nonce: u64,
    pub estimated: Mutex<Vec<(RskTransaction, String)>>,
}

impl MockRpc {
    pub fn with_balance(balance_wei: u128) -> Self {
        Self {
            balance_wei,
            gas: 23_000,
            gas_price_wei: 65_164_000,
            nonce: 7,
            estimated: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChainRpcProvider for MockRpc {
    async fn get_balance(&self, _address: &str) -> Result<u128> {
        Ok(self.balance_wei)
    }

    async fn estimate_gas(&self, transaction: &RskTransaction, from: &str) -> Result<u64> {
        self.estimated
            .lock()
            .unwrap()
            .push((transaction.clone(), from.to_string()));
        Ok(self.gas)
    }

    async fn get_gas_price(&self) -> Result<u128> {
        Ok(self.gas_price_wei)
    }

    async fn get_transaction_count(&self, _address: &str) -> Result<u64> {
        Ok(self.nonce)
    }
}

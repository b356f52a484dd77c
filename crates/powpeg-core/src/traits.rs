//! Collaborators the peg flows are written against.
//!
//! Every method is fallible; transport problems surface as
//! [`PowPegError::Api`](crate::error::PowPegError::Api).

use async_trait::async_trait;
use chain_btc::transaction::PeginTransaction;
use chain_rsk::transaction::RskTransaction;

use crate::error::Result;
use crate::types::{AddressWithDetails, FeeLevel, Utxo};

/// Bitcoin-side chain data and broadcasting.
#[async_trait]
pub trait BitcoinDataSource: Send + Sync {
    /// Fee rate in sat/byte for the given confirmation target.
    async fn get_fee_rate(&self, level: FeeLevel) -> Result<u64>;

    /// Raw hex of a confirmed transaction.
    async fn get_tx_hex(&self, txid: &str) -> Result<String>;

    async fn get_outputs(&self, address: &str) -> Result<Vec<Utxo>>;

    async fn get_address_details(&self, address: &str) -> Result<AddressWithDetails>;

    /// Broadcast a signed transaction, returning its txid.
    async fn broadcast(&self, signed_hex: &str) -> Result<String>;
}

/// Bitcoin wallet able to hand out addresses and sign peg-ins.
#[async_trait]
pub trait BitcoinSigner: Send + Sync {
    async fn get_non_change_addresses(&self, count: usize) -> Result<Vec<String>>;

    async fn get_change_addresses(&self, count: usize) -> Result<Vec<String>>;

    /// Sign a funded peg-in. `inputs` and `raw_transactions` are index-aligned
    /// with the transaction inputs. Returns the signed transaction hex.
    async fn sign_transaction(
        &self,
        transaction: &PeginTransaction,
        inputs: &[Utxo],
        raw_transactions: &[String],
    ) -> Result<String>;
}

/// Read access to the bridge precompile.
#[async_trait]
pub trait BridgeContract: Send + Sync {
    /// Current federation bitcoin address.
    async fn get_federation_address(&self) -> Result<String>;

    /// Expected bitcoin fee in satoshis charged to the next peg-out.
    async fn get_pegout_estimated_fee(&self) -> Result<u64>;
}

/// Rootstock node access.
#[async_trait]
pub trait ChainRpcProvider: Send + Sync {
    /// Balance in wei.
    async fn get_balance(&self, address: &str) -> Result<u128>;

    async fn estimate_gas(&self, transaction: &RskTransaction, from: &str) -> Result<u64>;

    /// Gas price in wei.
    async fn get_gas_price(&self) -> Result<u128>;

    /// Next nonce of `address`, counting pending transactions.
    async fn get_transaction_count(&self, address: &str) -> Result<u64>;
}

/// Whether a signing device is currently occupied with another request.
pub trait DeviceStatus: Send + Sync {
    fn is_busy(&self) -> bool;
}

/// A device that never reports itself busy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReady;

impl DeviceStatus for AlwaysReady {
    fn is_busy(&self) -> bool {
        false
    }
}

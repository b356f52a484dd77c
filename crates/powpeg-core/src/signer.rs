use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bitcoin::psbt::Psbt;
use chain_btc::address::{derive_address, AddressType};
use chain_btc::network::BtcNetwork;
use chain_btc::transaction::PeginTransaction;
use tracing::{debug, info};

use crate::error::{PowPegError, Result};
use crate::queue::SignerCommandQueue;
use crate::traits::{BitcoinSigner, DeviceStatus};
use crate::types::Utxo;

/// Everything a device needs to sign a peg-in.
#[derive(Debug, Clone)]
pub struct DeviceSignRequest {
    pub psbt: Psbt,
    pub inputs: Vec<Utxo>,
    pub raw_transactions: Vec<String>,
    /// Derivation path of the key spending each input, index-aligned.
    pub key_paths: Vec<String>,
    pub address_type: AddressType,
}

/// Low-level hardware wallet interface. Implementations talk to the device;
/// they do not need to guard against concurrent use.
#[async_trait]
pub trait SignerDevice: DeviceStatus {
    /// Extended public key at `path`, e.g. `m/84'/1'/0'/0`.
    async fn get_wallet_xpub(&self, path: &str) -> Result<String>;

    /// Sign and return the fully serialized transaction hex.
    async fn sign_payment(&self, request: DeviceSignRequest) -> Result<String>;
}

/// [`BitcoinSigner`] over a [`SignerDevice`], with every device command
/// routed through one [`SignerCommandQueue`].
///
/// Addresses are derived locally from the account xpub; the derivation path
/// of each handed-out address is remembered for signing.
pub struct QueuedSigner<D> {
    device: Arc<D>,
    queue: SignerCommandQueue,
    network: BtcNetwork,
    address_type: AddressType,
    key_paths: Arc<Mutex<HashMap<String, String>>>,
}

impl<D: SignerDevice + 'static> QueuedSigner<D> {
    pub fn new(
        device: D,
        network: BtcNetwork,
        address_type: AddressType,
        busy_poll_interval: Option<Duration>,
    ) -> Self {
        let device = Arc::new(device);
        let queue = SignerCommandQueue::new(device.clone(), busy_poll_interval);
        Self {
            device,
            queue,
            network,
            address_type,
            key_paths: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn address_type(&self) -> AddressType {
        self.address_type
    }

    /// `m/<purpose>'/<coin>'/0'/<change>`
    pub fn base_path(&self, change: bool) -> String {
        format!(
            "m/{}'/{}'/0'/{}",
            self.address_type.purpose(),
            self.network.coin_type(),
            u8::from(change)
        )
    }

    /// Path of an address previously handed out by this signer.
    pub fn key_path(&self, address: &str) -> Option<String> {
        lock_paths(&self.key_paths).get(address).cloned()
    }

    pub fn queue(&self) -> &SignerCommandQueue {
        &self.queue
    }

    async fn get_addresses(&self, count: usize, change: bool) -> Result<Vec<String>> {
        let device = self.device.clone();
        let key_paths = self.key_paths.clone();
        let base_path = self.base_path(change);
        let network = self.network;
        let address_type = self.address_type;

        let addresses = self
            .queue
            .enqueue(move || async move {
                let xpub = device.get_wallet_xpub(&base_path).await?;
                let mut addresses = Vec::with_capacity(count);
                for i in 0..count {
                    let index = u32::try_from(i)
                        .map_err(|_| PowPegError::Signer(format!("address index {i} out of range")))?;
                    let address = derive_address(&xpub, index, address_type, network)?;
                    lock_paths(&key_paths).insert(address.clone(), format!("{base_path}/{index}"));
                    addresses.push(address);
                }
                Ok(addresses)
            })
            .await?;

        debug!(count = addresses.len(), change, %address_type, "derived signer addresses");
        Ok(addresses)
    }
}

fn lock_paths(paths: &Mutex<HashMap<String, String>>) -> MutexGuard<'_, HashMap<String, String>> {
    paths.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl<D: SignerDevice + 'static> BitcoinSigner for QueuedSigner<D> {
    async fn get_non_change_addresses(&self, count: usize) -> Result<Vec<String>> {
        self.get_addresses(count, false).await
    }

    async fn get_change_addresses(&self, count: usize) -> Result<Vec<String>> {
        self.get_addresses(count, true).await
    }

    async fn sign_transaction(
        &self,
        transaction: &PeginTransaction,
        inputs: &[Utxo],
        raw_transactions: &[String],
    ) -> Result<String> {
        if inputs.len() != raw_transactions.len() || inputs.len() != transaction.tx.input.len() {
            return Err(PowPegError::Signer(format!(
                "{} inputs, {} raw transactions and {} transaction inputs do not line up",
                inputs.len(),
                raw_transactions.len(),
                transaction.tx.input.len()
            )));
        }

        let key_paths = {
            let paths = lock_paths(&self.key_paths);
            inputs
                .iter()
                .map(|input| {
                    paths.get(&input.address).cloned().ok_or_else(|| {
                        PowPegError::Signer(format!("no key path known for {}", input.address))
                    })
                })
                .collect::<Result<Vec<_>>>()?
        };

        let request = DeviceSignRequest {
            psbt: transaction.to_psbt()?,
            inputs: inputs.to_vec(),
            raw_transactions: raw_transactions.to_vec(),
            key_paths,
            address_type: self.address_type,
        };

        let device = self.device.clone();
        let signed = self
            .queue
            .enqueue(move || async move { device.sign_payment(request).await })
            .await?;
        info!(inputs = inputs.len(), "peg-in signed on device");
        Ok(signed)
    }
}

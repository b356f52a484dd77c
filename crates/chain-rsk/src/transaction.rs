use alloy_rlp::{Encodable, RlpEncodable};
use serde::Serialize;
use sha3::{Digest, Keccak256};

use crate::address::parse_address;
use crate::error::RskError;

/// Gas limit of a plain value transfer.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// An unsigned legacy (pre-EIP-2718) Rootstock transaction.
///
/// Rootstock does not support typed transactions, so signers consume the
/// EIP-155 payload produced by [`encode_unsigned_tx`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RskTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    /// Recipient address as a 0x-prefixed hex string.
    pub to: String,
    /// Transfer value in wei.
    pub value: u128,
    /// Calldata (empty for value transfers).
    pub data: Vec<u8>,
}

/// Builds an unsigned value transfer.
pub fn build_transfer(
    chain_id: u64,
    nonce: u64,
    to: &str,
    value_wei: u128,
    gas_price: u128,
    gas_limit: u64,
) -> Result<RskTransaction, RskError> {
    parse_address(to)?;

    Ok(RskTransaction {
        chain_id,
        nonce,
        gas_price,
        gas_limit,
        to: to.to_string(),
        value: value_wei,
        data: Vec::new(),
    })
}

impl RskTransaction {
    /// Fee ceiling in wei: `gas_limit * gas_price`.
    pub fn max_fee(&self) -> Result<u128, RskError> {
        u128::from(self.gas_limit)
            .checked_mul(self.gas_price)
            .ok_or_else(|| RskError::InvalidAmount("gas fee overflows u128".into()))
    }
}

/// Encodes the EIP-155 signing payload
/// `rlp([nonce, gas_price, gas_limit, to, value, data, chain_id, 0, 0])`.
pub fn encode_unsigned_tx(tx: &RskTransaction) -> Result<Vec<u8>, RskError> {
    let fields = UnsignedTxFields {
        nonce: tx.nonce,
        gas_price: tx.gas_price,
        gas_limit: tx.gas_limit,
        to: RlpBytes(parse_address(&tx.to)?.to_vec()),
        value: tx.value,
        data: RlpBytes(tx.data.clone()),
        chain_id: tx.chain_id,
        r: 0,
        s: 0,
    };

    let mut out = Vec::with_capacity(fields.length());
    fields.encode(&mut out);
    Ok(out)
}

/// Keccak-256 of the EIP-155 signing payload.
pub fn signing_hash(tx: &RskTransaction) -> Result<[u8; 32], RskError> {
    let payload = encode_unsigned_tx(tx)?;
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&Keccak256::digest(&payload));
    Ok(hash)
}

#[derive(RlpEncodable)]
struct UnsignedTxFields {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: RlpBytes,
    value: u128,
    data: RlpBytes,
    chain_id: u64,
    r: u8,
    s: u8,
}

/// Byte string wrapper; `Vec<u8>` would otherwise encode as a list.
struct RlpBytes(Vec<u8>);

impl Encodable for RlpBytes {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.0.as_slice().encode(out);
    }

    fn length(&self) -> usize {
        self.0.as_slice().length()
    }
}

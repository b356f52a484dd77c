use std::str::FromStr;

use bitcoin::address::{Address, NetworkUnchecked};
use bitcoin::bip32::{ChildNumber, Xpub};
use bitcoin::secp256k1::Secp256k1;
use bitcoin::CompressedPublicKey;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::BtcError;
use crate::network::BtcNetwork;

/// Script families a wallet address can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressType {
    /// P2PKH (`1...` / `m...`, `n...`).
    Legacy,
    /// P2SH-wrapped P2WPKH (`3...` / `2...`).
    Segwit,
    /// Bech32 P2WPKH (`bc1...` / `tb1...`).
    NativeSegwit,
}

impl AddressType {
    /// BIP-44/49/84 purpose used in the derivation path for this type.
    pub fn purpose(self) -> u32 {
        match self {
            AddressType::Legacy => 44,
            AddressType::Segwit => 49,
            AddressType::NativeSegwit => 84,
        }
    }
}

impl std::fmt::Display for AddressType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressType::Legacy => write!(f, "LEGACY"),
            AddressType::Segwit => write!(f, "SEGWIT"),
            AddressType::NativeSegwit => write!(f, "NATIVE SEGWIT"),
        }
    }
}

struct AddressPatterns {
    legacy: Regex,
    segwit: Regex,
    native_segwit: Regex,
}

impl AddressPatterns {
    fn new(legacy_prefix: &str, segwit_prefix: &str, hrp: &str) -> Result<Self, regex::Error> {
        // base58 alphabet without 0, O, I, l; bech32 data charset without 1, b, i, o.
        let base58 = "[1-9A-HJ-NP-Za-km-z]{25,34}";
        let bech32 = "[02-9ac-hj-np-z]{39,59}";
        Ok(Self {
            legacy: Regex::new(&format!("^{legacy_prefix}{base58}$"))?,
            segwit: Regex::new(&format!("^{segwit_prefix}{base58}$"))?,
            native_segwit: Regex::new(&format!("^{hrp}1{bech32}$"))?,
        })
    }
}

static MAINNET_PATTERNS: Lazy<Option<AddressPatterns>> =
    Lazy::new(|| AddressPatterns::new("1", "3", "bc").ok());
static TESTNET_PATTERNS: Lazy<Option<AddressPatterns>> =
    Lazy::new(|| AddressPatterns::new("[mn]", "2", "tb").ok());

/// Classify an address string by its network-specific shape.
///
/// Patterns are tried in the order LEGACY, SEGWIT, NATIVE SEGWIT and the
/// first match wins. Returns `None` for anything unrecognized, including
/// addresses of the other network. No checksum is verified here.
pub fn classify_address(address: &str, network: BtcNetwork) -> Option<AddressType> {
    let patterns = match network {
        BtcNetwork::Mainnet => MAINNET_PATTERNS.as_ref()?,
        BtcNetwork::Testnet => TESTNET_PATTERNS.as_ref()?,
    };

    if patterns.legacy.is_match(address) {
        Some(AddressType::Legacy)
    } else if patterns.segwit.is_match(address) {
        Some(AddressType::Segwit)
    } else if patterns.native_segwit.is_match(address) {
        Some(AddressType::NativeSegwit)
    } else {
        None
    }
}

/// Render the address of the given type for a compressed public key.
pub fn pubkey_to_address(
    pubkey: &CompressedPublicKey,
    address_type: AddressType,
    network: BtcNetwork,
) -> String {
    let net = network.to_bitcoin_network();
    let address = match address_type {
        AddressType::Legacy => Address::p2pkh(pubkey.pubkey_hash(), net),
        AddressType::Segwit => Address::p2shwpkh(pubkey, net),
        AddressType::NativeSegwit => Address::p2wpkh(pubkey, net),
    };
    address.to_string()
}

/// Same as [`pubkey_to_address`] but starting from the 33 serialized bytes.
pub fn pubkey_bytes_to_address(
    pubkey_bytes: &[u8; 33],
    address_type: AddressType,
    network: BtcNetwork,
) -> Result<String, BtcError> {
    let pubkey = CompressedPublicKey::from_slice(pubkey_bytes).map_err(|e| {
        BtcError::InvalidPublicKey(format!("failed to parse compressed public key: {e}"))
    })?;
    Ok(pubkey_to_address(&pubkey, address_type, network))
}

/// Derive the address at `index` below an extended public key.
///
/// The xpub is expected to sit at the `.../<change>` level of a
/// `m/<purpose>'/<coin>'/0'/<change>` path, so only one non-hardened step
/// is taken.
pub fn derive_address(
    xpub: &str,
    index: u32,
    address_type: AddressType,
    network: BtcNetwork,
) -> Result<String, BtcError> {
    let xpub = Xpub::from_str(xpub)
        .map_err(|e| BtcError::InvalidExtendedKey(format!("failed to parse xpub: {e}")))?;
    let child = ChildNumber::from_normal_idx(index)
        .map_err(|e| BtcError::InvalidExtendedKey(format!("invalid child index {index}: {e}")))?;

    let secp = Secp256k1::verification_only();
    let derived = xpub
        .derive_pub(&secp, &[child])
        .map_err(|e| BtcError::InvalidExtendedKey(format!("derivation failed: {e}")))?;

    Ok(pubkey_to_address(
        &CompressedPublicKey(derived.public_key),
        address_type,
        network,
    ))
}

/// Parse an address and require it to belong to `network`.
pub fn parse_address(address: &str, network: BtcNetwork) -> Result<Address, BtcError> {
    address
        .parse::<Address<NetworkUnchecked>>()
        .map_err(|e| BtcError::InvalidAddress(format!("failed to parse {address}: {e}")))?
        .require_network(network.to_bitcoin_network())
        .map_err(|e| BtcError::InvalidAddress(format!("{address} is not a {network} address: {e}")))
}

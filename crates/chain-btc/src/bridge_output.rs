//! Encoding of the zero-value data output that tells the bridge where to
//! credit a peg-in.
//!
//! ```text
//!  0        4   5                   25    26                  46
//!  |--------|---|-------------------|-----|-------------------|
//!    "RSKT"  v1      recipient        tag     refund hash160
//! ```
//!
//! The refund part is optional and only defined for LEGACY (`0x01`) and
//! SEGWIT (`0x02`) refund addresses.

use bitcoin::base58;
use bitcoin::script::{PushBytesBuf, ScriptBuf};

use crate::address::{classify_address, AddressType};
use crate::error::BtcError;
use crate::network::BtcNetwork;

/// `RSKT` magic followed by the protocol version byte.
pub const POWPEG_HEADER: [u8; 5] = [0x52, 0x53, 0x4b, 0x54, 0x01];

/// Refund tag for P2PKH refund addresses.
pub const LEGACY_REFUND_TAG: u8 = 0x01;

/// Refund tag for P2SH refund addresses.
pub const SEGWIT_REFUND_TAG: u8 = 0x02;

/// Length of a payload without the refund part.
pub const BASE_PAYLOAD_LEN: usize = POWPEG_HEADER.len() + 20;

/// Length of a payload carrying a refund tag and hash.
pub const REFUND_PAYLOAD_LEN: usize = BASE_PAYLOAD_LEN + 1 + 20;

/// Refund tag for an address type, if the bridge protocol defines one.
pub fn refund_tag(address_type: AddressType) -> Option<u8> {
    match address_type {
        AddressType::Legacy => Some(LEGACY_REFUND_TAG),
        AddressType::Segwit => Some(SEGWIT_REFUND_TAG),
        AddressType::NativeSegwit => None,
    }
}

/// Build the bridge payload for `recipient` (a `0x`-prefixed 20-byte
/// smart-contract-chain address) and an optional bitcoin refund address.
///
/// Refund addresses that are native segwit or unrecognized on `network` are
/// left out of the payload; the bridge then falls back to the sender.
pub fn encode_bridge_output(
    recipient: &str,
    refund_address: Option<&str>,
    network: BtcNetwork,
) -> Result<Vec<u8>, BtcError> {
    let recipient_bytes = parse_recipient(recipient)?;

    let mut payload = Vec::with_capacity(REFUND_PAYLOAD_LEN);
    payload.extend_from_slice(&POWPEG_HEADER);
    payload.extend_from_slice(&recipient_bytes);

    if let Some(refund) = refund_address {
        let tag = classify_address(refund, network).and_then(refund_tag);
        if let Some(tag) = tag {
            payload.push(tag);
            payload.extend_from_slice(&base58_hash160(refund)?);
        }
    }

    Ok(payload)
}

/// Wrap a bridge payload in an `OP_RETURN` script.
pub fn bridge_output_script(payload: &[u8]) -> Result<ScriptBuf, BtcError> {
    let push = PushBytesBuf::try_from(payload.to_vec())
        .map_err(|e| BtcError::EncodingError(format!("bridge payload too large: {e}")))?;
    Ok(ScriptBuf::new_op_return(push))
}

fn parse_recipient(recipient: &str) -> Result<[u8; 20], BtcError> {
    let hex_str = recipient
        .strip_prefix("0x")
        .or_else(|| recipient.strip_prefix("0X"))
        .unwrap_or(recipient);

    let bytes = hex::decode(hex_str)
        .map_err(|e| BtcError::InvalidAddress(format!("recipient {recipient} is not hex: {e}")))?;

    bytes.try_into().map_err(|bytes: Vec<u8>| {
        BtcError::InvalidAddress(format!(
            "recipient must be 20 bytes, got {}",
            bytes.len()
        ))
    })
}

/// The 20-byte hash carried by a base58check (P2PKH/P2SH) address.
fn base58_hash160(address: &str) -> Result<[u8; 20], BtcError> {
    let decoded = base58::decode_check(address)
        .map_err(|e| BtcError::InvalidAddress(format!("failed to decode {address}: {e}")))?;

    if decoded.len() != 21 {
        return Err(BtcError::InvalidAddress(format!(
            "{address} decodes to {} bytes, expected 21",
            decoded.len()
        )));
    }

    let mut hash = [0u8; 20];
    hash.copy_from_slice(&decoded[1..]);
    Ok(hash)
}

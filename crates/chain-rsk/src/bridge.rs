//! Calldata and return decoding for the bridge precompile.

use crate::abi::{decode_string, decode_uint, encode_function_call};
use crate::error::RskError;

/// `getFederationAddress()`
pub const GET_FEDERATION_ADDRESS: [u8; 4] = [0x69, 0x23, 0xfa, 0x85];

/// `getEstimatedFeesForNextPegOutEvent()`
pub const GET_ESTIMATED_PEGOUT_FEES: [u8; 4] = [0x78, 0x17, 0xd8, 0x54];

/// `getQueuedPegoutsCount()`
pub const GET_QUEUED_PEGOUTS_COUNT: [u8; 4] = [0xf4, 0xe4, 0xf9, 0x63];

pub fn encode_get_federation_address() -> Vec<u8> {
    encode_function_call(GET_FEDERATION_ADDRESS, &[])
}

pub fn encode_get_estimated_pegout_fees() -> Vec<u8> {
    encode_function_call(GET_ESTIMATED_PEGOUT_FEES, &[])
}

pub fn encode_get_queued_pegouts_count() -> Vec<u8> {
    encode_function_call(GET_QUEUED_PEGOUTS_COUNT, &[])
}

/// Decodes the federation's bitcoin address.
pub fn decode_federation_address(data: &[u8]) -> Result<String, RskError> {
    let address = decode_string(data)?;
    if address.is_empty() {
        return Err(RskError::DecodingError("bridge returned an empty federation address".into()));
    }
    Ok(address)
}

/// Decodes a `uint256` bridge return value into satoshis.
pub fn decode_sat_amount(data: &[u8]) -> Result<u64, RskError> {
    let value = decode_uint(data)?;
    u64::try_from(value)
        .map_err(|_| RskError::DecodingError(format!("{value} does not fit in satoshis")))
}

/// Expected per-peg-out share of the next peg-out event's bitcoin fee.
///
/// The estimated event fee is split across the queued peg-outs plus the one
/// about to be requested.
pub fn pegout_fee_share(estimated_event_fee_sat: u64, queued_pegouts: u64) -> u64 {
    estimated_event_fee_sat / queued_pegouts.saturating_add(1)
}

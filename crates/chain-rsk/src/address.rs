use sha3::{Digest, Keccak256};

use crate::error::RskError;

/// Parses a 0x-prefixed hex address string into its 20 raw bytes.
///
/// Checksums are not verified here; see [`validate_address`].
pub fn parse_address(address: &str) -> Result<[u8; 20], RskError> {
    let hex_str = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| RskError::InvalidAddress("address must start with 0x".into()))?;

    if hex_str.len() != 40 {
        return Err(RskError::InvalidAddress(format!(
            "expected 40 hex characters, got {}",
            hex_str.len()
        )));
    }

    let bytes = hex::decode(hex_str)
        .map_err(|e| RskError::InvalidAddress(format!("invalid hex: {e}")))?;

    let mut addr = [0u8; 20];
    addr.copy_from_slice(&bytes);
    Ok(addr)
}

/// Validates a Rootstock address string.
///
/// Single-case addresses carry no checksum and are accepted as long as they
/// are well-formed. Mixed-case addresses must match either the EIP-1191
/// checksum for `chain_id` or the plain EIP-55 checksum.
pub fn validate_address(address: &str, chain_id: u64) -> Result<bool, RskError> {
    parse_address(address)?;
    let hex_part = &address[2..];

    let is_all_lower = hex_part.chars().all(|c| !c.is_ascii_uppercase());
    let is_all_upper = hex_part.chars().all(|c| !c.is_ascii_lowercase());
    if is_all_lower || is_all_upper {
        return Ok(true);
    }

    let lower = format!("0x{}", hex_part.to_lowercase());
    let rsk = checksum_address(&lower, Some(chain_id))?;
    if rsk[2..] == *hex_part {
        return Ok(true);
    }
    let eip55 = checksum_address(&lower, None)?;
    Ok(eip55[2..] == *hex_part)
}

/// Applies mixed-case checksum encoding to an address.
///
/// With `chain_id` set this is EIP-1191 (the hashed text is prefixed with
/// the decimal chain id and `0x`); without it this is plain EIP-55.
pub fn checksum_address(address: &str, chain_id: Option<u64>) -> Result<String, RskError> {
    let bytes = parse_address(address)?;
    let hex_part = hex::encode(bytes);

    let hashed = match chain_id {
        Some(id) => format!("{id}0x{hex_part}"),
        None => hex_part.clone(),
    };
    let hash = Keccak256::digest(hashed.as_bytes());

    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");

    for (i, c) in hex_part.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }

    Ok(checksummed)
}

//! Minimal ABI encoding and decoding for EVM function calls.
//!
//! Just enough to talk to the bridge precompile without pulling in a full ABI
//! parser.

use sha3::{Digest, Keccak256};

use crate::error::RskError;

/// A single ABI-encoded parameter.
#[derive(Debug, Clone)]
pub enum AbiParam {
    /// A 20-byte address, left-padded to 32 bytes.
    Address([u8; 20]),
    /// A 256-bit unsigned integer as a big-endian 32-byte array.
    Uint256([u8; 32]),
}

/// First four bytes of the Keccak-256 hash of a canonical signature such as
/// `getFederationAddress()`.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash[..4]);
    selector
}

/// Encodes a function call as `selector || encode(params[0]) || ...`.
pub fn encode_function_call(selector: [u8; 4], params: &[AbiParam]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + params.len() * 32);
    data.extend_from_slice(&selector);

    for param in params {
        data.extend_from_slice(&encode_param(param));
    }

    data
}

fn encode_param(param: &AbiParam) -> [u8; 32] {
    match param {
        AbiParam::Address(addr) => {
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(addr);
            word
        }
        AbiParam::Uint256(value) => *value,
    }
}

/// Decodes a single `uint256` return value that must fit in a `u128`.
pub fn decode_uint(data: &[u8]) -> Result<u128, RskError> {
    let word = read_word(data, 0)?;
    if word[..16].iter().any(|&b| b != 0) {
        return Err(RskError::DecodingError("uint256 overflows u128".into()));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

/// Decodes a single dynamic `string` return value.
pub fn decode_string(data: &[u8]) -> Result<String, RskError> {
    let offset = word_to_usize(read_word(data, 0)?)?;
    let len = word_to_usize(read_word(data, offset)?)?;
    let start = offset
        .checked_add(32)
        .ok_or_else(|| RskError::DecodingError("string offset overflow".into()))?;
    let end = start
        .checked_add(len)
        .ok_or_else(|| RskError::DecodingError("string length overflow".into()))?;
    let bytes = data.get(start..end).ok_or_else(|| {
        RskError::DecodingError(format!("string needs {end} bytes, got {}", data.len()))
    })?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| RskError::DecodingError(format!("string is not utf-8: {e}")))
}

fn read_word(data: &[u8], offset: usize) -> Result<&[u8], RskError> {
    offset
        .checked_add(32)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| {
            RskError::DecodingError(format!(
                "expected 32-byte word at offset {offset}, got {} bytes",
                data.len()
            ))
        })
}

fn word_to_usize(word: &[u8]) -> Result<usize, RskError> {
    if word[..24].iter().any(|&b| b != 0) {
        return Err(RskError::DecodingError("offset out of range".into()));
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&word[24..]);
    usize::try_from(u64::from_be_bytes(low))
        .map_err(|_| RskError::DecodingError("offset out of range".into()))
}

/// Encodes a `u128` as a big-endian 32-byte word.
pub fn uint_word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_string(s: &str) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&uint_word(32));
        out.extend_from_slice(&uint_word(s.len() as u128));
        let mut body = s.as_bytes().to_vec();
        body.resize(s.len().div_ceil(32) * 32, 0);
        out.extend_from_slice(&body);
        out
    }

    #[test]
    fn known_selectors() {
        assert_eq!(
            function_selector("transfer(address,uint256)"),
            [0xa9, 0x05, 0x9c, 0xbb]
        );
        assert_eq!(
            function_selector("getFederationAddress()"),
            [0x69, 0x23, 0xfa, 0x85]
        );
    }

    #[test]
    fn encode_address_param() {
        let mut addr = [0u8; 20];
        addr[0] = 0xde;
        addr[19] = 0xad;

        let word = encode_param(&AbiParam::Address(addr));
        assert_eq!(&word[..12], &[0u8; 12]);
        assert_eq!(&word[12..], &addr);
    }

    #[test]
    fn encode_function_call_with_params() {
        let selector = [0xa9, 0x05, 0x9c, 0xbb];
        let mut addr = [0u8; 20];
        addr[19] = 0x01;

        let params = [AbiParam::Address(addr), AbiParam::Uint256(uint_word(100))];
        let data = encode_function_call(selector, &params);

        assert_eq!(data.len(), 68);
        assert_eq!(&data[..4], &selector);
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(data[35], 0x01);
        assert_eq!(data[67], 100);
    }

    #[test]
    fn decode_uint_roundtrip() {
        assert_eq!(decode_uint(&uint_word(42)).unwrap(), 42);
        assert_eq!(decode_uint(&uint_word(u128::MAX)).unwrap(), u128::MAX);
    }

    #[test]
    fn decode_uint_rejects_overflow_and_short_input() {
        let mut word = [0u8; 32];
        word[0] = 1;
        assert!(decode_uint(&word).is_err());
        assert!(decode_uint(&[0u8; 31]).is_err());
    }

    #[test]
    fn decode_string_reads_dynamic_value() {
        let addr = "2N5muMepJizJE1gR7FbHJU6CD18V3BpNF9p";
        assert_eq!(decode_string(&encode_string(addr)).unwrap(), addr);
        assert_eq!(decode_string(&encode_string("")).unwrap(), "");
    }

    #[test]
    fn decode_string_rejects_truncated_body() {
        let mut data = encode_string("hello world");
        data.truncate(70);
        assert!(decode_string(&data).is_err());
    }
}

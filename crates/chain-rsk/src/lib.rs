//! Rootstock (smart-contract chain) side of the powpeg.
//!
//! This crate provides:
//! - Rootstock network definitions and the bridge precompile address
//! - Address validation with EIP-55 / EIP-1191 checksums
//! - RBTC amount parsing and formatting
//! - Minimal ABI encoding/decoding for bridge precompile calls
//! - The unsigned peg-out value transfer and its EIP-155 signing payload

pub mod abi;
pub mod address;
pub mod bridge;
pub mod chains;
pub mod error;
pub mod transaction;
pub mod units;

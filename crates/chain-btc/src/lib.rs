//! Bitcoin-chain side of the powpeg.
//!
//! Classifies and derives addresses, estimates fees for the fixed peg-in
//! shape, selects inputs smallest-first, encodes the bridge data output, and
//! assembles the unsigned peg-in transaction. Nothing in this crate performs
//! I/O; callers feed it data fetched from their own data sources.

pub mod address;
pub mod bridge_output;
pub mod error;
pub mod network;
pub mod transaction;
pub mod utxo;

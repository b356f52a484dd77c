//! Two-way peg transaction engine between bitcoin and Rootstock.
//!
//! - [`pegin::PeginBuilder`] locks bitcoin in the federation with a bridge
//!   payload naming the Rootstock recipient.
//! - [`pegout::PegoutBuilder`] prepares the RBTC transfer that asks the bridge
//!   for a bitcoin payout.
//! - [`queue::SignerCommandQueue`] keeps hardware signer commands strictly
//!   one at a time.
//!
//! Network access goes through the collaborator traits in [`traits`];
//! [`api::ApiService`] and [`rpc`] provide HTTP-backed implementations.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod pegin;
pub mod pegout;
pub mod queue;
pub mod rpc;
pub mod signer;
pub mod traits;
pub mod types;

pub use config::PowPegConfig;
pub use error::{PowPegError, Result};
pub use pegin::{FundedPegin, PeginBuilder};
pub use pegout::{PegoutBuilder, PegoutRequest};

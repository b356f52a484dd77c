//! Peg-out flow: a plain RBTC transfer to the bridge precompile.

use std::sync::Arc;

use chain_rsk::address::parse_address;
use chain_rsk::chains::BRIDGE_ADDRESS;
use chain_rsk::transaction::{build_transfer, RskTransaction};
use chain_rsk::units::{format_rbtc, MIN_PEGOUT_WEI};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::PowPegConfig;
use crate::error::{timed, AmountUnit, PowPegError, Result};
use crate::traits::{BridgeContract, ChainRpcProvider};

/// Reject peg-outs the bridge would refuse.
pub fn ensure_min_pegout(amount_wei: u128) -> Result<()> {
    if amount_wei < MIN_PEGOUT_WEI {
        return Err(PowPegError::AmountBelowMin {
            minimum: MIN_PEGOUT_WEI,
            unit: AmountUnit::Wei,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PegoutFees {
    /// Expected share of the bitcoin payout fee, deducted by the bridge.
    pub bitcoin_fee_sat: u64,
    /// Gas cost of the transfer itself.
    pub chain_fee_wei: u128,
}

/// Unsigned peg-out ready for an external signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PegoutRequest {
    pub sender: String,
    pub transaction: RskTransaction,
    pub fees: PegoutFees,
}

struct Quote {
    gas_limit: u64,
    gas_price: u128,
    fees: PegoutFees,
}

pub struct PegoutBuilder {
    rpc: Arc<dyn ChainRpcProvider>,
    bridge: Arc<dyn BridgeContract>,
    config: PowPegConfig,
}

impl PegoutBuilder {
    pub fn new(
        rpc: Arc<dyn ChainRpcProvider>,
        bridge: Arc<dyn BridgeContract>,
        config: PowPegConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { rpc, bridge, config })
    }

    /// Bitcoin-side and chain-side fees of pegging out `amount_wei` from
    /// `from`.
    pub async fn estimate_fees(&self, amount_wei: u128, from: &str) -> Result<PegoutFees> {
        ensure_min_pegout(amount_wei)?;
        validate_sender(from)?;
        Ok(self.quote(amount_wei, from).await?.fees)
    }

    /// Validate `amount_wei` against the minimum and the sender's balance and
    /// return the unsigned transfer. Signing and sending are up to the caller.
    pub async fn create_pegout(&self, amount_wei: u128, sender: &str) -> Result<PegoutRequest> {
        ensure_min_pegout(amount_wei)?;
        validate_sender(sender)?;

        let limit = self.config.call_timeout();
        let balance = timed(limit, self.rpc.get_balance(sender)).await?;
        if balance < amount_wei {
            return Err(PowPegError::NotEnoughFunds {
                shortfall: amount_wei - balance,
                unit: AmountUnit::Wei,
            });
        }

        let (quote, nonce) = futures::try_join!(
            self.quote(amount_wei, sender),
            timed(limit, self.rpc.get_transaction_count(sender)),
        )?;

        let transaction = build_transfer(
            self.config.rsk_chain().chain_id,
            nonce,
            BRIDGE_ADDRESS,
            amount_wei,
            quote.gas_price,
            quote.gas_limit,
        )?;

        info!(
            amount = %format_rbtc(amount_wei),
            nonce,
            bitcoin_fee_sat = quote.fees.bitcoin_fee_sat,
            chain_fee_wei = %quote.fees.chain_fee_wei,
            "peg-out created"
        );

        Ok(PegoutRequest {
            sender: sender.to_string(),
            transaction,
            fees: quote.fees,
        })
    }

    async fn quote(&self, amount_wei: u128, from: &str) -> Result<Quote> {
        let limit = self.config.call_timeout();
        let trial = build_transfer(self.config.rsk_chain().chain_id, 0, BRIDGE_ADDRESS, amount_wei, 0, 0)?;

        let (gas_limit, gas_price, bitcoin_fee_sat) = futures::try_join!(
            timed(limit, self.rpc.estimate_gas(&trial, from)),
            timed(limit, self.rpc.get_gas_price()),
            timed(limit, self.bridge.get_pegout_estimated_fee()),
        )?;

        let chain_fee_wei = u128::from(gas_limit)
            .checked_mul(gas_price)
            .ok_or_else(|| PowPegError::api("gas fee estimate overflows"))?;
        debug!(gas_limit, %gas_price, bitcoin_fee_sat, "peg-out quote");

        Ok(Quote {
            gas_limit,
            gas_price,
            fees: PegoutFees {
                bitcoin_fee_sat,
                chain_fee_wei,
            },
        })
    }
}

fn validate_sender(sender: &str) -> Result<()> {
    parse_address(sender)
        .map(|_| ())
        .map_err(|_| PowPegError::InvalidAddress(vec![sender.to_string()]))
}

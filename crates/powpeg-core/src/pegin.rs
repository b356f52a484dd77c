//! Peg-in flow: discover addresses, build the bridge transaction, fund it
//! from the wallet's UTXOs and hand it to the signer.

use std::sync::Arc;

use chain_btc::address::classify_address;
use chain_btc::bridge_output::{encode_bridge_output, refund_tag};
use chain_btc::transaction::{
    estimate_fee, needs_change_output, FeeEstimate, PeginTransaction, MIN_PEGIN_SAT,
};
use chain_btc::utxo::select_inputs;
use futures::future::try_join_all;
use tracing::{debug, info, warn};

use crate::config::PowPegConfig;
use crate::error::{timed, AmountUnit, PowPegError, Result};
use crate::traits::{BitcoinDataSource, BitcoinSigner, BridgeContract};
use crate::types::{AddressWithDetails, FeeLevel, Utxo};

/// Reject peg-ins the bridge would refuse.
pub fn ensure_min_pegin(amount_sat: u64) -> Result<()> {
    if amount_sat < MIN_PEGIN_SAT {
        return Err(PowPegError::AmountBelowMin {
            minimum: u128::from(MIN_PEGIN_SAT),
            unit: AmountUnit::Sat,
        });
    }
    Ok(())
}

/// Outcome of one address discovery round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressDiscovery {
    /// Used addresses (change or not) holding a balance.
    pub spendable: Vec<AddressWithDetails>,
    /// First unused receive address.
    pub refund_address: Option<String>,
    /// First unused change address.
    pub change_address: Option<String>,
}

/// A funded, unsigned peg-in and the data needed to sign it.
#[derive(Debug, Clone)]
pub struct FundedPegin {
    pub transaction: PeginTransaction,
    /// Spent UTXOs in input order.
    pub inputs: Vec<Utxo>,
    /// Raw previous transactions, index-aligned with `inputs`.
    pub raw_transactions: Vec<String>,
    /// Size-based fee for the chosen fee rate.
    pub estimate: FeeEstimate,
    /// Actual fee: inputs minus outputs, including any burned dust.
    pub fee_sat: u64,
}

#[derive(Debug, Default)]
struct FundingCache {
    utxos: Vec<Utxo>,
    change_address: Option<String>,
}

/// Builds, funds, signs and broadcasts peg-in transactions.
///
/// `create_pegin` caches the wallet's spendable UTXOs for the following
/// `fund_pegin`; use one builder per concurrent peg-in flow.
pub struct PeginBuilder {
    signer: Arc<dyn BitcoinSigner>,
    data_source: Arc<dyn BitcoinDataSource>,
    bridge: Arc<dyn BridgeContract>,
    config: PowPegConfig,
    cache: FundingCache,
}

impl PeginBuilder {
    pub fn new(
        signer: Arc<dyn BitcoinSigner>,
        data_source: Arc<dyn BitcoinDataSource>,
        bridge: Arc<dyn BridgeContract>,
        config: PowPegConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            signer,
            data_source,
            bridge,
            config,
            cache: FundingCache::default(),
        })
    }

    pub fn config(&self) -> &PowPegConfig {
        &self.config
    }

    /// UTXOs cached by the last `create_pegin`.
    pub fn cached_utxos(&self) -> &[Utxo] {
        &self.cache.utxos
    }

    pub fn cached_change_address(&self) -> Option<&str> {
        self.cache.change_address.as_deref()
    }

    /// Ask the signer for `bundle_size` receive and change addresses and
    /// sort them by usage.
    pub async fn init_addresses(&self, bundle_size: usize) -> Result<AddressDiscovery> {
        let limit = self.config.call_timeout();
        let (receive, change) = futures::try_join!(
            timed(limit, self.signer.get_non_change_addresses(bundle_size)),
            timed(limit, self.signer.get_change_addresses(bundle_size)),
        )?;

        let invalid: Vec<String> = receive
            .iter()
            .chain(&change)
            .filter(|address| classify_address(address, self.config.network).is_none())
            .cloned()
            .collect();
        if !invalid.is_empty() {
            return Err(PowPegError::InvalidAddress(invalid));
        }

        let (receive, change) = futures::try_join!(
            self.address_details(&receive),
            self.address_details(&change),
        )?;

        let refund_address = receive.iter().find(|a| !a.is_used()).map(|a| a.address.clone());
        let change_address = change.iter().find(|a| !a.is_used()).map(|a| a.address.clone());
        let spendable: Vec<AddressWithDetails> = receive
            .into_iter()
            .chain(change)
            .filter(|a| a.is_used() && a.has_funds())
            .collect();

        info!(
            spendable = spendable.len(),
            has_refund = refund_address.is_some(),
            has_change = change_address.is_some(),
            "address discovery complete"
        );

        Ok(AddressDiscovery {
            spendable,
            refund_address,
            change_address,
        })
    }

    async fn address_details(&self, addresses: &[String]) -> Result<Vec<AddressWithDetails>> {
        let limit = self.config.call_timeout();
        try_join_all(
            addresses
                .iter()
                .map(|address| timed(limit, self.data_source.get_address_details(address))),
        )
        .await
    }

    /// Bridge payload for `recipient` with an optional refund address.
    ///
    /// The bridge only understands legacy and p2sh-segwit refunds; any other
    /// refund address is left out, so the bridge refunds the sender instead.
    pub fn encode_bridge_output(&self, recipient: &str, refund_address: Option<&str>) -> Result<Vec<u8>> {
        chain_rsk::address::parse_address(recipient)
            .map_err(|_| PowPegError::InvalidAddress(vec![recipient.to_string()]))?;

        if let Some(refund) = refund_address {
            let kind = classify_address(refund, self.config.network);
            if kind.and_then(refund_tag).is_none() {
                warn!(refund, ?kind, "refund address type not supported by the bridge, omitting it");
            }
        }

        Ok(encode_bridge_output(recipient, refund_address, self.config.network)?)
    }

    /// Build the two-output peg-in paying `amount_sat` to the federation,
    /// and cache the wallet's UTXOs for funding.
    pub async fn create_pegin(&mut self, amount_sat: u64, recipient: &str) -> Result<PeginTransaction> {
        let discovery = self.init_addresses(self.config.bundle_size).await?;
        let payload = self.encode_bridge_output(recipient, discovery.refund_address.as_deref())?;

        let limit = self.config.call_timeout();
        let federation = timed(limit, self.bridge.get_federation_address()).await?;
        debug!(%federation, "fetched federation address");

        let transaction = PeginTransaction::new(&payload, &federation, amount_sat, self.config.network)?;

        let outputs = try_join_all(
            discovery
                .spendable
                .iter()
                .map(|a| timed(limit, self.data_source.get_outputs(&a.address))),
        )
        .await?;

        self.cache = FundingCache {
            utxos: outputs.into_iter().flatten().collect(),
            change_address: discovery.change_address,
        };
        info!(amount_sat, utxos = self.cache.utxos.len(), "peg-in created");
        Ok(transaction)
    }

    /// Select inputs for `transaction` at the fee rate of `fee_level`, add a
    /// change output when the excess is above the dust threshold, and attach
    /// the spent outputs from their raw previous transactions.
    pub async fn fund_pegin(&self, mut transaction: PeginTransaction, fee_level: FeeLevel) -> Result<FundedPegin> {
        let amount_sat = transaction.amount_sat()?;
        ensure_min_pegin(amount_sat)?;

        let limit = self.config.call_timeout();
        let fee_rate = timed(limit, self.data_source.get_fee_rate(fee_level)).await?;
        let base = estimate_fee(fee_rate, 0)?;
        let selection = select_inputs(
            amount_sat,
            &self.cache.utxos,
            base.base_fee_sat,
            base.fee_per_input_sat,
        );

        if let Some(shortfall) = selection.shortfall() {
            return Err(PowPegError::NotEnoughFunds {
                shortfall: u128::from(shortfall),
                unit: AmountUnit::Sat,
            });
        }

        let change = selection.change();
        if needs_change_output(change, self.config.dust_value) {
            let change_address = match (&self.cache.change_address, selection.inputs.first()) {
                (Some(address), _) => address.clone(),
                (None, Some(first)) => first.address.clone(),
                (None, None) => {
                    return Err(PowPegError::Config("no address available for change".into()))
                }
            };
            transaction.add_change_output(&change_address, change, self.config.network)?;
            debug!(change, %change_address, "added change output");
        } else if change > 0 {
            debug!(change, "change below dust threshold, burning as fee");
        }

        let raw_transactions = try_join_all(
            selection
                .inputs
                .iter()
                .map(|input| timed(limit, self.data_source.get_tx_hex(&input.txid))),
        )
        .await?;

        for (input, raw) in selection.inputs.iter().zip(&raw_transactions) {
            transaction.add_input(input, raw)?;
        }

        let estimate = estimate_fee(fee_rate, selection.inputs.len())?;
        let fee_sat = transaction
            .input_total_sat()
            .saturating_sub(transaction.output_total_sat());

        info!(
            inputs = selection.inputs.len(),
            fee_rate,
            fee_sat,
            change,
            "peg-in funded"
        );

        Ok(FundedPegin {
            transaction,
            inputs: selection.inputs,
            raw_transactions,
            estimate,
            fee_sat,
        })
    }

    /// `create_pegin` followed by `fund_pegin`, rejecting small amounts
    /// before any network call.
    pub async fn create_and_fund_pegin(
        &mut self,
        amount_sat: u64,
        recipient: &str,
        fee_level: FeeLevel,
    ) -> Result<FundedPegin> {
        ensure_min_pegin(amount_sat)?;
        let transaction = self.create_pegin(amount_sat, recipient).await?;
        self.fund_pegin(transaction, fee_level).await
    }

    /// Sign through the signer and broadcast, returning the txid.
    pub async fn sign_and_broadcast(&self, funded: &FundedPegin) -> Result<String> {
        let limit = self.config.call_timeout();
        let signed = timed(
            limit,
            self.signer.sign_transaction(&funded.transaction, &funded.inputs, &funded.raw_transactions),
        )
        .await?;
        let txid = timed(limit, self.data_source.broadcast(&signed)).await?;
        info!(%txid, "peg-in broadcast");
        Ok(txid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_pegin_boundary() {
        assert!(ensure_min_pegin(MIN_PEGIN_SAT).is_ok());
        match ensure_min_pegin(100_000) {
            Err(PowPegError::AmountBelowMin { minimum, unit }) => {
                assert_eq!(minimum, 500_000);
                assert_eq!(unit, AmountUnit::Sat);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}

use std::str::FromStr;

use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode;
use bitcoin::psbt::Psbt;
use bitcoin::script::ScriptBuf;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, Sequence, Transaction, TxIn, TxOut, Txid, Witness};

use crate::address::parse_address;
use crate::bridge_output::bridge_output_script;
use crate::error::BtcError;
use crate::network::BtcNetwork;
use crate::utxo::Utxo;

/// Fixed transaction overhead in bytes.
pub const TX_HEADER_BYTES: u64 = 13;

/// Size budget of each output in bytes.
pub const TX_OUTPUT_BYTES: u64 = 32;

/// Size budget of each input in bytes. Sized for the largest script type
/// a signer may hand us, so the estimate never undershoots.
pub const TX_INPUT_BYTES: u64 = 145;

/// Data output, federation output and change output.
pub const PEGIN_OUTPUT_COUNT: u64 = 3;

/// Upper bound for change that is burned as fee instead of being returned.
pub const BURN_DUST_MAX_SAT: u64 = 30_000;

/// Smallest peg-in the bridge accepts.
pub const MIN_PEGIN_SAT: u64 = 500_000;

/// Index of the federation payment among the peg-in outputs.
const FEDERATION_OUTPUT_INDEX: usize = 1;

/// Size-based fee estimate for the fixed three-output peg-in shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    /// Header plus all outputs.
    pub base_fee_sat: u64,
    /// Cost of one additional input.
    pub fee_per_input_sat: u64,
    /// `base_fee_sat + fee_per_input_sat * inputs`.
    pub total_fee_sat: u64,
}

/// Estimate the fee of a peg-in with `num_inputs` inputs at `fee_rate_sat_byte`.
///
/// Fails with [`BtcError::FeeOverflow`] when the rate is too large to price
/// the transaction in satoshis.
pub fn estimate_fee(fee_rate_sat_byte: u64, num_inputs: usize) -> Result<FeeEstimate, BtcError> {
    let overflow =
        || BtcError::FeeOverflow(format!("rate {fee_rate_sat_byte} sat/byte, {num_inputs} inputs"));

    let base_fee_sat = fee_rate_sat_byte
        .checked_mul(TX_HEADER_BYTES + TX_OUTPUT_BYTES * PEGIN_OUTPUT_COUNT)
        .ok_or_else(overflow)?;
    let fee_per_input_sat = fee_rate_sat_byte
        .checked_mul(TX_INPUT_BYTES)
        .ok_or_else(overflow)?;
    let total_fee_sat = u64::try_from(num_inputs)
        .ok()
        .and_then(|n| fee_per_input_sat.checked_mul(n))
        .and_then(|inputs_fee| inputs_fee.checked_add(base_fee_sat))
        .ok_or_else(overflow)?;

    Ok(FeeEstimate {
        base_fee_sat,
        fee_per_input_sat,
        total_fee_sat,
    })
}

/// Effective dust threshold: the caller's value capped by [`BURN_DUST_MAX_SAT`].
pub fn dust_threshold(configured_dust_sat: u64) -> u64 {
    configured_dust_sat.min(BURN_DUST_MAX_SAT)
}

/// Whether `change_sat` deserves its own output rather than being burned.
pub fn needs_change_output(change_sat: u64, configured_dust_sat: u64) -> bool {
    change_sat > dust_threshold(configured_dust_sat)
}

/// A peg-in transaction under construction.
///
/// Created with the bridge data output and the federation payment, then
/// extended with an optional change output and the funding inputs.
#[derive(Debug, Clone)]
pub struct PeginTransaction {
    /// The bitcoin transaction with empty script sigs and witnesses.
    pub tx: Transaction,
    /// Outputs being spent, in the same order as the transaction inputs.
    pub prevouts: Vec<TxOut>,
}

impl PeginTransaction {
    /// Start a peg-in paying `amount_sat` to the federation.
    pub fn new(
        bridge_payload: &[u8],
        federation_address: &str,
        amount_sat: u64,
        network: BtcNetwork,
    ) -> Result<Self, BtcError> {
        let federation = parse_address(federation_address, network)?;
        let data_output = TxOut {
            value: Amount::ZERO,
            script_pubkey: bridge_output_script(bridge_payload)?,
        };
        let federation_output = TxOut {
            value: Amount::from_sat(amount_sat),
            script_pubkey: federation.script_pubkey(),
        };

        Ok(Self {
            tx: Transaction {
                version: Version::TWO,
                lock_time: LockTime::ZERO,
                input: Vec::new(),
                output: vec![data_output, federation_output],
            },
            prevouts: Vec::new(),
        })
    }

    /// The requested peg-in amount, read back from the federation output.
    pub fn amount_sat(&self) -> Result<u64, BtcError> {
        self.tx
            .output
            .get(FEDERATION_OUTPUT_INDEX)
            .map(|out| out.value.to_sat())
            .ok_or_else(|| BtcError::TransactionBuildError("missing federation output".into()))
    }

    /// Append a change output.
    pub fn add_change_output(
        &mut self,
        address: &str,
        value_sat: u64,
        network: BtcNetwork,
    ) -> Result<(), BtcError> {
        let change = parse_address(address, network)?;
        self.tx.output.push(TxOut {
            value: Amount::from_sat(value_sat),
            script_pubkey: change.script_pubkey(),
        });
        Ok(())
    }

    /// Spend `utxo`, taking script and value from its full previous
    /// transaction (`raw_tx_hex`).
    pub fn add_input(&mut self, utxo: &Utxo, raw_tx_hex: &str) -> Result<(), BtcError> {
        let txid = Txid::from_str(&utxo.txid)
            .map_err(|e| BtcError::TransactionBuildError(format!("invalid txid {}: {e}", utxo.txid)))?;
        let prev_tx = decode_raw_transaction(raw_tx_hex)?;

        if prev_tx.compute_txid() != txid {
            return Err(BtcError::InvalidRawTransaction(format!(
                "raw transaction hashes to {}, expected {txid}",
                prev_tx.compute_txid()
            )));
        }

        let prevout = prev_tx.output.get(utxo.vout as usize).cloned().ok_or_else(|| {
            BtcError::InvalidRawTransaction(format!("{txid} has no output {}", utxo.vout))
        })?;

        if prevout.value.to_sat() != utxo.amount_sat {
            return Err(BtcError::InvalidRawTransaction(format!(
                "{txid}:{} holds {} sat, data source reported {}",
                utxo.vout,
                prevout.value.to_sat(),
                utxo.amount_sat
            )));
        }

        self.tx.input.push(TxIn {
            previous_output: OutPoint::new(txid, utxo.vout),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::default(),
        });
        self.prevouts.push(prevout);
        Ok(())
    }

    pub fn input_total_sat(&self) -> u64 {
        self.prevouts.iter().map(|out| out.value.to_sat()).sum()
    }

    pub fn output_total_sat(&self) -> u64 {
        self.tx.output.iter().map(|out| out.value.to_sat()).sum()
    }

    /// Consensus-serialized unsigned transaction as hex.
    pub fn unsigned_hex(&self) -> String {
        encode::serialize_hex(&self.tx)
    }

    /// Render as a PSBT with the spent outputs attached as witness UTXOs.
    pub fn to_psbt(&self) -> Result<Psbt, BtcError> {
        let mut psbt = Psbt::from_unsigned_tx(self.tx.clone())
            .map_err(|e| BtcError::TransactionBuildError(format!("psbt creation failed: {e}")))?;
        for (input, prevout) in psbt.inputs.iter_mut().zip(&self.prevouts) {
            input.witness_utxo = Some(prevout.clone());
        }
        Ok(psbt)
    }
}

/// Decode a hex-encoded consensus-serialized transaction.
pub fn decode_raw_transaction(raw_tx_hex: &str) -> Result<Transaction, BtcError> {
    let bytes = hex::decode(raw_tx_hex.trim())
        .map_err(|e| BtcError::InvalidRawTransaction(format!("not hex: {e}")))?;
    encode::deserialize(&bytes).map_err(|e| BtcError::InvalidRawTransaction(e.to_string()))
}

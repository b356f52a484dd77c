use serde::{Deserialize, Serialize};

/// A single unspent transaction output (UTXO) owned by one of our addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Address that can spend this output.
    pub address: String,
    /// Transaction ID as a hex string (big-endian / display order).
    pub txid: String,
    /// Output index within the transaction.
    pub vout: u32,
    /// Value in satoshis.
    pub amount_sat: u64,
}

/// Result of input selection.
///
/// `required` is what the selected inputs must cover: target, base fee and
/// one per-input fee for every selected input. Exactly one of
/// [`InputSelection::shortfall`] and [`InputSelection::change`] is meaningful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSelection {
    /// Selected UTXOs, smallest first.
    pub inputs: Vec<Utxo>,
    /// Total value of the selected UTXOs in satoshis.
    pub total_in_sat: u64,
    /// Target plus all fees implied by the selection.
    pub required_sat: u64,
}

impl InputSelection {
    /// Satoshis still missing after every candidate was consumed.
    pub fn shortfall(&self) -> Option<u64> {
        (self.required_sat > self.total_in_sat).then(|| self.required_sat - self.total_in_sat)
    }

    /// Excess over `required_sat`; candidate value for a change output.
    pub fn change(&self) -> u64 {
        self.total_in_sat.saturating_sub(self.required_sat)
    }

    pub fn is_funded(&self) -> bool {
        self.shortfall().is_none()
    }
}

/// Select inputs covering `target_sat` under a linear fee model.
///
/// Candidates are walked smallest-first (stable on ties, so equal amounts
/// keep their original relative order). Every accepted input adds its value
/// and costs `fee_per_input_sat`; walking stops as soon as the selection is
/// funded. Small outputs get consumed before large ones, which keeps the
/// wallet's UTXO set lean at the price of more inputs per transaction.
pub fn select_inputs(
    target_sat: u64,
    candidates: &[Utxo],
    base_fee_sat: u64,
    fee_per_input_sat: u64,
) -> InputSelection {
    let mut sorted: Vec<&Utxo> = candidates.iter().collect();
    sorted.sort_by_key(|utxo| utxo.amount_sat);

    let mut selection = InputSelection {
        inputs: Vec::new(),
        total_in_sat: 0,
        required_sat: target_sat.saturating_add(base_fee_sat),
    };

    for utxo in sorted {
        if selection.is_funded() {
            break;
        }
        selection.inputs.push(utxo.clone());
        selection.total_in_sat = selection.total_in_sat.saturating_add(utxo.amount_sat);
        selection.required_sat = selection.required_sat.saturating_add(fee_per_input_sat);
    }

    selection
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_utxo(txid: &str, vout: u32, amount_sat: u64) -> Utxo {
        Utxo {
            address: "mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn".to_string(),
            txid: txid.to_string(),
            vout,
            amount_sat,
        }
    }

    #[test]
    fn smallest_first_ordering() {
        let utxos = vec![
            make_utxo("large", 0, 100_000),
            make_utxo("small", 0, 1_000),
            make_utxo("medium", 0, 50_000),
        ];
        let selection = select_inputs(40_000, &utxos, 100, 10);

        let picked: Vec<&str> = selection.inputs.iter().map(|u| u.txid.as_str()).collect();
        assert_eq!(picked, vec!["small", "medium"]);
        assert_eq!(selection.total_in_sat, 51_000);
        assert_eq!(selection.required_sat, 40_000 + 100 + 2 * 10);
        assert_eq!(selection.change(), 51_000 - 40_120);
        assert!(selection.shortfall().is_none());
    }

    #[test]
    fn stops_as_soon_as_funded() {
        let utxos = vec![
            make_utxo("a", 0, 30_000),
            make_utxo("b", 0, 30_000),
            make_utxo("c", 0, 30_000),
        ];
        let selection = select_inputs(55_000, &utxos, 0, 1_000);
        assert_eq!(selection.inputs.len(), 2);
        assert_eq!(selection.change(), 60_000 - 57_000);
    }

    #[test]
    fn exact_funding_has_no_change() {
        let utxos = vec![make_utxo("a", 0, 10_254)];
        let selection = select_inputs(10_000, &utxos, 109, 145);
        assert!(selection.is_funded());
        assert_eq!(selection.change(), 0);
    }

    #[test]
    fn insufficient_funds_reports_shortfall() {
        let utxos = vec![make_utxo("a", 0, 1_000), make_utxo("b", 1, 2_000)];
        let selection = select_inputs(500_000, &utxos, 109, 145);

        assert_eq!(selection.inputs.len(), 2);
        assert_eq!(selection.shortfall(), Some(500_000 + 109 + 290 - 3_000));
        assert_eq!(selection.change(), 0);
    }

    #[test]
    fn fee_exceeding_headroom_is_a_shortfall() {
        let utxos = vec![make_utxo("a", 0, 1_000_000)];
        let selection = select_inputs(1_000_000, &utxos, 109, 145);
        assert_eq!(selection.shortfall(), Some(254));
    }

    #[test]
    fn empty_candidates_short_by_target_and_base_fee() {
        let selection = select_inputs(1_000, &[], 50, 10);
        assert!(selection.inputs.is_empty());
        assert_eq!(selection.shortfall(), Some(1_050));
    }

    #[test]
    fn ties_keep_submission_order() {
        let utxos = vec![
            make_utxo("first", 0, 5_000),
            make_utxo("second", 0, 5_000),
            make_utxo("third", 0, 5_000),
        ];
        let selection = select_inputs(9_000, &utxos, 0, 0);
        let picked: Vec<&str> = selection.inputs.iter().map(|u| u.txid.as_str()).collect();
        assert_eq!(picked, vec!["first", "second"]);
    }

    #[test]
    fn selection_is_deterministic() {
        let utxos: Vec<Utxo> = (0..20)
            .map(|i| make_utxo(&format!("tx{i}"), i, 1_000 + u64::from(i % 7) * 3_000))
            .collect();

        let first = select_inputs(25_000, &utxos, 109, 145);
        for _ in 0..5 {
            assert_eq!(select_inputs(25_000, &utxos, 109, 145), first);
        }
    }

    #[test]
    fn funded_selections_cover_amount_and_fees() {
        let utxos: Vec<Utxo> = (0..12)
            .map(|i| make_utxo(&format!("tx{i}"), i, 20_000 * u64::from(i + 1)))
            .collect();

        for fee_rate in [1u64, 5, 20, 80] {
            for amount in [500_000u64, 750_000, 1_200_000, 2_000_000] {
                let base_fee = fee_rate * 109;
                let per_input = fee_rate * 145;
                let selection = select_inputs(amount, &utxos, base_fee, per_input);
                let needed = amount + base_fee + per_input * selection.inputs.len() as u64;

                match selection.shortfall() {
                    Some(missing) => {
                        assert_eq!(selection.inputs.len(), utxos.len());
                        assert_eq!(missing, needed - selection.total_in_sat);
                    }
                    None => assert!(selection.total_in_sat >= needed),
                }
            }
        }
    }
}

use alloy_primitives::utils::parse_ether;

use crate::error::RskError;

/// Decimal places of one RBTC.
pub const RBTC_DECIMALS: usize = 18;

/// Wei per RBTC (18 decimals).
pub const WEI_PER_RBTC: u128 = 1_000_000_000_000_000_000;

/// Wei per satoshi. One RBTC maps 1:1 to one BTC.
pub const WEI_PER_SAT: u128 = 10_000_000_000;

/// Smallest peg-out the bridge accepts: 0.004 RBTC.
pub const MIN_PEGOUT_WEI: u128 = 4_000_000_000_000_000;

/// Parses a decimal RBTC amount such as `"0.005"` into wei.
pub fn parse_rbtc(amount: &str) -> Result<u128, RskError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(RskError::InvalidAmount("empty amount".into()));
    }
    if trimmed.starts_with('-') {
        return Err(RskError::InvalidAmount(format!("negative amount: {trimmed}")));
    }
    if let Some((_, fraction)) = trimmed.split_once('.') {
        if fraction.len() > RBTC_DECIMALS {
            return Err(RskError::InvalidAmount(format!(
                "{trimmed}: more than {RBTC_DECIMALS} decimal places"
            )));
        }
    }

    let wei = parse_ether(trimmed)
        .map_err(|e| RskError::InvalidAmount(format!("{trimmed}: {e}")))?;
    u128::try_from(wei).map_err(|_| RskError::InvalidAmount(format!("{trimmed}: too large")))
}

/// Formats wei as a decimal RBTC string without trailing zeros.
pub fn format_rbtc(wei: u128) -> String {
    let whole = wei / WEI_PER_RBTC;
    let frac = wei % WEI_PER_RBTC;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:018}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Converts satoshis to wei.
pub fn sat_to_wei(sat: u64) -> u128 {
    u128::from(sat) * WEI_PER_SAT
}

/// Converts wei to satoshis, truncating any sub-satoshi remainder.
pub fn wei_to_sat(wei: u128) -> u128 {
    wei / WEI_PER_SAT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_whole_and_fractional() {
        assert_eq!(parse_rbtc("1").unwrap(), WEI_PER_RBTC);
        assert_eq!(parse_rbtc("0.004").unwrap(), MIN_PEGOUT_WEI);
        assert_eq!(parse_rbtc(" 0.5 ").unwrap(), WEI_PER_RBTC / 2);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_rbtc("").is_err());
        assert!(parse_rbtc("abc").is_err());
        assert!(parse_rbtc("-1").is_err());
    }

    #[test]
    fn parse_rejects_excess_precision() {
        assert!(parse_rbtc("0.0000000000000000001").is_err());
        assert!(parse_rbtc("0.0040000000000000009").is_err());
        assert_eq!(parse_rbtc("0.000000000000000001").unwrap(), 1);
    }

    #[test]
    fn format_trims_trailing_zeros() {
        assert_eq!(format_rbtc(0), "0");
        assert_eq!(format_rbtc(WEI_PER_RBTC), "1");
        assert_eq!(format_rbtc(MIN_PEGOUT_WEI), "0.004");
        assert_eq!(format_rbtc(WEI_PER_RBTC + 1), "1.000000000000000001");
    }

    #[test]
    fn sat_wei_conversion() {
        assert_eq!(sat_to_wei(100_000_000), WEI_PER_RBTC);
        assert_eq!(wei_to_sat(MIN_PEGOUT_WEI), 400_000);
        assert_eq!(wei_to_sat(WEI_PER_SAT - 1), 0);
    }
}

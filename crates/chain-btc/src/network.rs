use bitcoin::Network;
use serde::{Deserialize, Serialize};

/// Default 2wp REST API for Bitcoin mainnet.
pub const MAINNET_API: &str = "https://api.2wp.rootstock.io";

/// Default 2wp REST API for Bitcoin testnet.
pub const TESTNET_API: &str = "https://api.2wp.testnet.rootstock.io";

/// Bitcoin networks the powpeg is deployed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BtcNetwork {
    Mainnet,
    Testnet,
}

impl BtcNetwork {
    /// Convert to the `bitcoin` crate's `Network` type.
    pub fn to_bitcoin_network(self) -> Network {
        match self {
            BtcNetwork::Mainnet => Network::Bitcoin,
            BtcNetwork::Testnet => Network::Testnet,
        }
    }

    /// BIP-44 coin type used in derivation paths.
    pub fn coin_type(self) -> u32 {
        match self {
            BtcNetwork::Mainnet => 0,
            BtcNetwork::Testnet => 1,
        }
    }

    /// Return the default REST data-source endpoint for this network.
    pub fn default_api_url(self) -> &'static str {
        match self {
            BtcNetwork::Mainnet => MAINNET_API,
            BtcNetwork::Testnet => TESTNET_API,
        }
    }

    pub fn is_testnet(self) -> bool {
        self == BtcNetwork::Testnet
    }
}

impl std::fmt::Display for BtcNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BtcNetwork::Mainnet => write!(f, "mainnet"),
            BtcNetwork::Testnet => write!(f, "testnet"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_to_bitcoin_network() {
        assert_eq!(BtcNetwork::Mainnet.to_bitcoin_network(), Network::Bitcoin);
        assert_eq!(BtcNetwork::Testnet.to_bitcoin_network(), Network::Testnet);
    }

    #[test]
    fn coin_types_follow_bip44() {
        assert_eq!(BtcNetwork::Mainnet.coin_type(), 0);
        assert_eq!(BtcNetwork::Testnet.coin_type(), 1);
    }

    #[test]
    fn api_urls_point_at_2wp() {
        assert!(BtcNetwork::Mainnet.default_api_url().contains("2wp"));
        assert!(BtcNetwork::Testnet.default_api_url().contains("testnet"));
    }

    #[test]
    fn display_names() {
        assert_eq!(BtcNetwork::Mainnet.to_string(), "mainnet");
        assert_eq!(BtcNetwork::Testnet.to_string(), "testnet");
    }

    #[test]
    fn deserializes_from_lowercase() {
        let net: BtcNetwork = serde_json::from_str("\"testnet\"").unwrap();
        assert_eq!(net, BtcNetwork::Testnet);
    }
}

use std::path::Path;
use std::time::Duration;

use chain_btc::network::BtcNetwork;
use chain_btc::transaction::{dust_threshold, BURN_DUST_MAX_SAT};
use chain_rsk::chains::{for_network, RskChain};
use serde::{Deserialize, Serialize};

use crate::error::{PowPegError, Result};

/// Addresses requested from the signer per discovery round.
pub const DEFAULT_BUNDLE_SIZE: usize = 10;

pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;

/// Runtime settings for peg-in and peg-out flows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowPegConfig {
    pub network: BtcNetwork,
    pub bundle_size: usize,
    /// Change at or below this value (capped at 30 000 sat) is burned as fee.
    pub dust_value: u64,
    pub call_timeout_ms: u64,
    pub api_url: Option<String>,
    pub rpc_url: Option<String>,
    /// When set, a busy signing device is re-polled at this interval.
    pub busy_poll_interval_ms: Option<u64>,
}

impl Default for PowPegConfig {
    fn default() -> Self {
        Self {
            network: BtcNetwork::Testnet,
            bundle_size: DEFAULT_BUNDLE_SIZE,
            dust_value: BURN_DUST_MAX_SAT,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            api_url: None,
            rpc_url: None,
            busy_poll_interval_ms: None,
        }
    }
}

impl PowPegConfig {
    /// Defaults for `network`.
    pub fn for_network(network: BtcNetwork) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| PowPegError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PowPegError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bundle_size == 0 {
            return Err(PowPegError::Config("bundle_size must be positive".into()));
        }
        if self.call_timeout_ms == 0 {
            return Err(PowPegError::Config("call_timeout_ms must be positive".into()));
        }
        if self.busy_poll_interval_ms == Some(0) {
            return Err(PowPegError::Config("busy_poll_interval_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn api_url(&self) -> &str {
        self.api_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_api_url())
    }

    pub fn rpc_url(&self) -> &str {
        self.rpc_url.as_deref().unwrap_or(self.rsk_chain().rpc_url)
    }

    /// The Rootstock network paired with the bitcoin network.
    pub fn rsk_chain(&self) -> &'static RskChain {
        for_network(self.network.is_testnet())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn busy_poll_interval(&self) -> Option<Duration> {
        self.busy_poll_interval_ms.map(Duration::from_millis)
    }

    /// Effective dust threshold in satoshis.
    pub fn dust_threshold(&self) -> u64 {
        dust_threshold(self.dust_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PowPegConfig::default();
        assert_eq!(config.network, BtcNetwork::Testnet);
        assert_eq!(config.bundle_size, 10);
        assert_eq!(config.dust_threshold(), 30_000);
        assert_eq!(config.call_timeout(), Duration::from_secs(30));
        assert_eq!(config.api_url(), "https://api.2wp.testnet.rootstock.io");
        assert_eq!(config.rpc_url(), "https://public-node.testnet.rsk.co");
        assert_eq!(config.rsk_chain().chain_id, 31);
        assert!(config.busy_poll_interval().is_none());
    }

    #[test]
    fn parses_partial_toml() {
        let config = PowPegConfig::from_toml_str(
            r#"
            network = "mainnet"
            dust_value = 50000
            busy_poll_interval_ms = 200
            "#,
        )
        .unwrap();
        assert_eq!(config.network, BtcNetwork::Mainnet);
        assert_eq!(config.bundle_size, 10);
        assert_eq!(config.dust_threshold(), 30_000);
        assert_eq!(config.busy_poll_interval(), Some(Duration::from_millis(200)));
        assert_eq!(config.api_url(), "https://api.2wp.rootstock.io");
        assert_eq!(config.rsk_chain().chain_id, 30);
    }

    #[test]
    fn explicit_urls_override_defaults() {
        let config = PowPegConfig::from_toml_str(
            r#"
            api_url = "http://localhost:3000"
            rpc_url = "http://localhost:4444"
            "#,
        )
        .unwrap();
        assert_eq!(config.api_url(), "http://localhost:3000");
        assert_eq!(config.rpc_url(), "http://localhost:4444");
    }

    #[test]
    fn small_dust_value_is_kept() {
        let config = PowPegConfig {
            dust_value: 1_000,
            ..PowPegConfig::default()
        };
        assert_eq!(config.dust_threshold(), 1_000);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            PowPegConfig::from_toml_str("bundle_size = 0"),
            Err(PowPegError::Config(_))
        ));
        assert!(matches!(
            PowPegConfig::from_toml_str("call_timeout_ms = 0"),
            Err(PowPegError::Config(_))
        ));
        assert!(matches!(
            PowPegConfig::from_toml_str("network = \"regtest\""),
            Err(PowPegError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_config_error() {
        assert!(matches!(
            PowPegConfig::load("/nonexistent/powpeg.toml"),
            Err(PowPegError::Config(_))
        ));
    }
}

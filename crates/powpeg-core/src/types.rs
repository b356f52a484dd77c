use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use chain_btc::utxo::Utxo;

/// Confirmation speed a peg-in fee is chosen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeLevel {
    Slow,
    Average,
    Fast,
}

impl FeeLevel {
    /// Target number of blocks until confirmation.
    pub fn target_blocks(self) -> u32 {
        match self {
            FeeLevel::Slow => 5,
            FeeLevel::Average => 3,
            FeeLevel::Fast => 1,
        }
    }
}

/// Usage summary of a bitcoin address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressWithDetails {
    pub address: String,
    /// Confirmed balance in satoshis.
    pub balance: u64,
    pub tx_count: u64,
}

impl AddressWithDetails {
    pub fn is_used(&self) -> bool {
        self.tx_count > 0
    }

    pub fn has_funds(&self) -> bool {
        self.balance > 0
    }
}

/// Direction of a peg transaction, as named by the status API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TxType {
    Pegin,
    Pegout,
}

impl TxType {
    pub fn as_str(self) -> &'static str {
        match self {
            TxType::Pegin => "PEGIN",
            TxType::Pegout => "PEGOUT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PEGIN" => Some(TxType::Pegin),
            "PEGOUT" => Some(TxType::Pegout),
            _ => None,
        }
    }
}

impl std::fmt::Display for TxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status report for a peg transaction. The shape of `details` depends on
/// the direction and is passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct TxStatus {
    pub tx_type: TxType,
    pub details: Value,
}

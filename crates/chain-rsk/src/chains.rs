use serde::Serialize;

/// Address of the bridge precompiled contract, identical on every network.
pub const BRIDGE_ADDRESS: &str = "0x0000000000000000000000000000000001000006";

/// Definition of a Rootstock network.
#[derive(Debug, Clone, Serialize)]
pub struct RskChain {
    pub chain_id: u64,
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
    pub rpc_url: &'static str,
    pub explorer_url: &'static str,
    pub is_testnet: bool,
}

/// Rootstock Mainnet (chain ID 30).
pub const RSK_MAINNET: RskChain = RskChain {
    chain_id: 30,
    name: "Rootstock Mainnet",
    symbol: "RBTC",
    decimals: 18,
    rpc_url: "https://public-node.rsk.co",
    explorer_url: "https://explorer.rootstock.io",
    is_testnet: false,
};

/// Rootstock Testnet (chain ID 31).
pub const RSK_TESTNET: RskChain = RskChain {
    chain_id: 31,
    name: "Rootstock Testnet",
    symbol: "tRBTC",
    decimals: 18,
    rpc_url: "https://public-node.testnet.rsk.co",
    explorer_url: "https://explorer.testnet.rootstock.io",
    is_testnet: true,
};

const ALL_CHAINS: &[&RskChain] = &[&RSK_MAINNET, &RSK_TESTNET];

/// Returns the chain definition for a given chain ID, or `None` if unsupported.
pub fn get_chain(chain_id: u64) -> Option<&'static RskChain> {
    ALL_CHAINS.iter().find(|c| c.chain_id == chain_id).copied()
}

/// The Rootstock network paired with a bitcoin mainnet or testnet.
pub fn for_network(is_testnet: bool) -> &'static RskChain {
    if is_testnet {
        &RSK_TESTNET
    } else {
        &RSK_MAINNET
    }
}

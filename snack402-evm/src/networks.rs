//! Known EVM chains and their USDC deployments.

use alloy_primitives::{Address, address};

/// An EIP-155 chain id (e.g. 8453 for Base).
pub type ChainId = u64;

/// Base Mainnet chain id.
pub const BASE_MAINNET: ChainId = 8453;

/// Base Sepolia (testnet) chain id.
pub const BASE_SEPOLIA: ChainId = 84532;

/// Ethereum Mainnet chain id.
pub const ETHEREUM_MAINNET: ChainId = 1;

/// Polygon Mainnet chain id.
pub const POLYGON_MAINNET: ChainId = 137;

/// Polygon Amoy (testnet) chain id.
pub const POLYGON_AMOY: ChainId = 80002;

/// Avalanche C-Chain chain id.
pub const AVALANCHE_MAINNET: ChainId = 43114;

/// Avalanche Fuji (testnet) chain id.
pub const AVALANCHE_FUJI: ChainId = 43113;

/// Celo Mainnet chain id.
pub const CELO_MAINNET: ChainId = 42220;

/// USDC contract address on Base Mainnet.
pub const USDC_BASE: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");

/// USDC contract address on Base Sepolia.
pub const USDC_BASE_SEPOLIA: Address = address!("036CbD53842c5426634e7929541eC2318f3dCF7e");

/// USDC contract address on Ethereum Mainnet.
pub const USDC_ETHEREUM: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");

/// USDC contract address on Polygon Mainnet.
pub const USDC_POLYGON: Address = address!("3c499c542cEF5E3811e1192ce70d8cC03d5c3359");

/// USDC contract address on Polygon Amoy.
pub const USDC_POLYGON_AMOY: Address = address!("41E94Eb71Ef8C9fAE0235d1e472b21E21B5a4dbF");

/// USDC contract address on Avalanche C-Chain.
pub const USDC_AVALANCHE: Address = address!("B97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E");

/// USDC contract address on Avalanche Fuji.
pub const USDC_AVALANCHE_FUJI: Address = address!("5425890298aed601595a70AB815c96711a31Bc65");

/// USDC contract address on Celo.
pub const USDC_CELO: Address = address!("cebA9300f2b948710d2653dD7B07f33A8B32118C");

/// Default EIP-712 domain name for USDC.
pub const DEFAULT_USDC_NAME: &str = "USD Coin";

/// Default EIP-712 domain version for USDC.
pub const DEFAULT_USDC_VERSION: &str = "2";

/// USDC deployments by chain id.
pub static USDC_DEPLOYMENTS: &[(ChainId, Address)] = &[
    (BASE_MAINNET, USDC_BASE),
    (BASE_SEPOLIA, USDC_BASE_SEPOLIA),
    (ETHEREUM_MAINNET, USDC_ETHEREUM),
    (POLYGON_MAINNET, USDC_POLYGON),
    (POLYGON_AMOY, USDC_POLYGON_AMOY),
    (AVALANCHE_MAINNET, USDC_AVALANCHE),
    (AVALANCHE_FUJI, USDC_AVALANCHE_FUJI),
    (CELO_MAINNET, USDC_CELO),
];

/// The USDC contract on `chain_id`, if known.
#[must_use]
pub fn usdc_address(chain_id: ChainId) -> Option<Address> {
    USDC_DEPLOYMENTS
        .iter()
        .find(|(id, _)| *id == chain_id)
        .map(|(_, address)| *address)
}

/// Resolves a requirement's network to an EIP-155 chain id.
///
/// Accepts V1 names (`"base"`) and CAIP-2 ids (`"eip155:8453"`). Returns
/// `None` for unknown names and non-EVM networks.
#[must_use]
pub fn evm_chain_id(network: &str) -> Option<ChainId> {
    snack402::chain::ChainId::resolve(network)?.evm_chain_id()
}

/// Formats a chain id as a CAIP-2 identifier.
#[must_use]
pub fn caip2(chain_id: ChainId) -> String {
    format!("eip155:{chain_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evm_chain_id() {
        assert_eq!(evm_chain_id("base"), Some(BASE_MAINNET));
        assert_eq!(evm_chain_id("base-sepolia"), Some(BASE_SEPOLIA));
        assert_eq!(evm_chain_id("eip155:137"), Some(POLYGON_MAINNET));
        assert_eq!(evm_chain_id("solana"), None);
        assert_eq!(evm_chain_id("nowhere"), None);
    }

    #[test]
    fn test_usdc_on_base() {
        assert_eq!(usdc_address(BASE_MAINNET), Some(USDC_BASE));
        assert_eq!(
            USDC_BASE.to_checksum(None),
            "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"
        );
        assert_eq!(usdc_address(999), None);
        assert_eq!(caip2(BASE_SEPOLIA), "eip155:84532");
    }
}

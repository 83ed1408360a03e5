//! Known Solana clusters and their USDC mints.
//!
//! Clusters are identified by the first 32 characters of their genesis hash,
//! which is also the CAIP-2 reference (`solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp`).

use std::fmt::{self, Display, Formatter};

use snack402::chain::ChainId;
use solana_pubkey::{Pubkey, pubkey};

/// CAIP-2 namespace of Solana networks.
pub const SOLANA_NAMESPACE: &str = "solana";

/// Genesis hash prefix of Solana mainnet-beta.
pub const SOLANA_MAINNET_REFERENCE: &str = "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp";

/// Genesis hash prefix of Solana devnet.
pub const SOLANA_DEVNET_REFERENCE: &str = "EtWTRABZaYq6iMfeYKouRu166VU2xqa1";

/// USDC mint on mainnet-beta.
pub const USDC_SOLANA: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");

/// USDC mint on devnet.
pub const USDC_SOLANA_DEVNET: Pubkey = pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU");

/// A Solana cluster payments can be made on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolanaCluster {
    /// Mainnet-beta.
    Mainnet,
    /// Devnet.
    Devnet,
}

impl SolanaCluster {
    /// Resolves a requirement's network to a cluster.
    ///
    /// Accepts V1 names (`"solana"`, `"solana-devnet"`) and CAIP-2 ids.
    /// Returns `None` for unknown names and non-Solana networks.
    #[must_use]
    pub fn from_network(network: &str) -> Option<Self> {
        let chain_id = ChainId::resolve(network)?;
        if chain_id.namespace() != SOLANA_NAMESPACE {
            return None;
        }
        match chain_id.reference() {
            SOLANA_MAINNET_REFERENCE => Some(Self::Mainnet),
            SOLANA_DEVNET_REFERENCE => Some(Self::Devnet),
            _ => None,
        }
    }

    /// The V1 network name.
    #[must_use]
    pub const fn network_name(self) -> &'static str {
        match self {
            Self::Mainnet => "solana",
            Self::Devnet => "solana-devnet",
        }
    }

    /// The genesis hash prefix.
    #[must_use]
    pub const fn reference(self) -> &'static str {
        match self {
            Self::Mainnet => SOLANA_MAINNET_REFERENCE,
            Self::Devnet => SOLANA_DEVNET_REFERENCE,
        }
    }

    /// The CAIP-2 identifier.
    #[must_use]
    pub fn caip2(self) -> String {
        format!("{SOLANA_NAMESPACE}:{}", self.reference())
    }

    /// The USDC mint on this cluster.
    #[must_use]
    pub const fn usdc(self) -> Pubkey {
        match self {
            Self::Mainnet => USDC_SOLANA,
            Self::Devnet => USDC_SOLANA_DEVNET,
        }
    }

    /// The public RPC endpoint of this cluster.
    ///
    /// Rate limited; set your own endpoint for anything beyond occasional use.
    #[must_use]
    pub const fn default_rpc_url(self) -> &'static str {
        match self {
            Self::Mainnet => "https://api.mainnet-beta.solana.com",
            Self::Devnet => "https://api.devnet.solana.com",
        }
    }
}

impl Display for SolanaCluster {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.network_name())
    }
}

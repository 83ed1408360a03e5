//! Well-known x402 network names.
//!
//! V1 challenges identify networks by short names (`"base"`); newer servers send
//! CAIP-2 ids (`"eip155:8453"`). [`KNOWN_NETWORKS`] maps between the two.

use crate::chain::ChainId;

/// A known network with its CAIP-2 components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInfo {
    /// V1 network name, e.g. `"base-sepolia"`.
    pub name: &'static str,
    /// CAIP-2 namespace, e.g. `"eip155"`.
    pub namespace: &'static str,
    /// CAIP-2 reference, e.g. `"84532"`.
    pub reference: &'static str,
}

impl NetworkInfo {
    /// The CAIP-2 chain id of this network.
    #[must_use]
    pub fn chain_id(&self) -> ChainId {
        ChainId::new(self.namespace, self.reference)
    }
}

const fn eip155(name: &'static str, reference: &'static str) -> NetworkInfo {
    NetworkInfo {
        name,
        namespace: "eip155",
        reference,
    }
}

/// Networks that appear in x402 challenges.
pub static KNOWN_NETWORKS: &[NetworkInfo] = &[
    eip155("base", "8453"),
    eip155("base-sepolia", "84532"),
    eip155("ethereum", "1"),
    eip155("sepolia", "11155111"),
    eip155("polygon", "137"),
    eip155("polygon-amoy", "80002"),
    eip155("avalanche", "43114"),
    eip155("avalanche-fuji", "43113"),
    eip155("celo", "42220"),
    eip155("celo-alfajores", "44787"),
    NetworkInfo {
        name: "solana",
        namespace: "solana",
        reference: "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp",
    },
    NetworkInfo {
        name: "solana-devnet",
        namespace: "solana",
        reference: "EtWTRABZaYq6iMfeYKouRu166VU2xqa1",
    },
];

/// Looks up a network by its V1 name.
#[must_use]
pub fn by_name(name: &str) -> Option<&'static NetworkInfo> {
    KNOWN_NETWORKS.iter().find(|n| n.name == name)
}

/// Looks up a network by its CAIP-2 chain id.
#[must_use]
pub fn by_chain_id(chain_id: &ChainId) -> Option<&'static NetworkInfo> {
    KNOWN_NETWORKS
        .iter()
        .find(|n| n.namespace == chain_id.namespace() && n.reference == chain_id.reference())
}

/// Whether `name` is a known testnet.
#[must_use]
pub fn is_testnet(name: &str) -> bool {
    matches!(
        name,
        "base-sepolia"
            | "sepolia"
            | "polygon-amoy"
            | "avalanche-fuji"
            | "celo-alfajores"
            | "solana-devnet"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        for (i, a) in KNOWN_NETWORKS.iter().enumerate() {
            for b in &KNOWN_NETWORKS[i + 1..] {
                assert_ne!(a.name, b.name);
                assert_ne!(a.chain_id(), b.chain_id());
            }
        }
    }

    #[test]
    fn test_lookup_both_ways() {
        let base = by_name("base").unwrap();
        assert_eq!(base.chain_id().to_string(), "eip155:8453");
        let back = by_chain_id(&ChainId::new("eip155", "84532")).unwrap();
        assert_eq!(back.name, "base-sepolia");
        assert!(by_name("dogechain").is_none());
    }

    #[test]
    fn test_testnets() {
        assert!(is_testnet("base-sepolia"));
        assert!(!is_testnet("base"));
    }
}

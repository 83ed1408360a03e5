//! CAIP-2 chain identifiers.
//!
//! A [`ChainId`] is `namespace:reference`, e.g. `eip155:8453` for Base.
//! [`ChainId::resolve`] accepts either form a challenge may carry: a CAIP-2 id
//! or a V1 network name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::networks;

/// A CAIP-2 compliant chain identifier.
///
/// Serializes to/from a colon-separated string: `"eip155:8453"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainId {
    namespace: String,
    reference: String,
}

impl ChainId {
    /// Creates a chain id from its components.
    pub fn new<N: Into<String>, R: Into<String>>(namespace: N, reference: R) -> Self {
        Self {
            namespace: namespace.into(),
            reference: reference.into(),
        }
    }

    /// The namespace component, e.g. `eip155`.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The reference component, e.g. `8453`.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Resolves a network identifier as found in a payment requirement.
    ///
    /// Accepts CAIP-2 ids and the V1 names in [`networks::KNOWN_NETWORKS`].
    #[must_use]
    pub fn resolve(network: &str) -> Option<Self> {
        if network.contains(':') {
            network.parse().ok()
        } else {
            networks::by_name(network).map(networks::NetworkInfo::chain_id)
        }
    }

    /// The V1 network name for this chain, if it is well known.
    #[must_use]
    pub fn network_name(&self) -> Option<&'static str> {
        networks::by_chain_id(self).map(|n| n.name)
    }

    /// The numeric chain id, for `eip155` chains only.
    #[must_use]
    pub fn evm_chain_id(&self) -> Option<u64> {
        if self.namespace == "eip155" {
            self.reference.parse().ok()
        } else {
            None
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.reference)
    }
}

/// Error returned when parsing an invalid chain id string.
#[derive(Debug, thiserror::Error)]
#[error("invalid chain id '{0}', expected namespace:reference")]
pub struct ChainIdFormatError(String);

impl FromStr for ChainId {
    type Err = ChainIdFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((namespace, reference)) if !namespace.is_empty() && !reference.is_empty() => {
                Ok(Self::new(namespace, reference))
            }
            _ => Err(ChainIdFormatError(s.to_owned())),
        }
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let id: ChainId = "eip155:8453".parse().unwrap();
        assert_eq!(id.namespace(), "eip155");
        assert_eq!(id.reference(), "8453");
        assert_eq!(id.to_string(), "eip155:8453");
        assert!("eip155".parse::<ChainId>().is_err());
        assert!(":8453".parse::<ChainId>().is_err());
        assert!("eip155:".parse::<ChainId>().is_err());
    }

    #[test]
    fn test_resolve_name_and_caip2() {
        assert_eq!(ChainId::resolve("base").unwrap().evm_chain_id(), Some(8453));
        assert_eq!(
            ChainId::resolve("eip155:84532").unwrap().network_name(),
            Some("base-sepolia")
        );
        assert_eq!(ChainId::resolve("eip155:999999").unwrap().evm_chain_id(), Some(999_999));
        assert!(ChainId::resolve("unknown-net").is_none());
    }

    #[test]
    fn test_solana_is_not_evm() {
        let id = ChainId::resolve("solana").unwrap();
        assert_eq!(id.namespace(), "solana");
        assert_eq!(id.evm_chain_id(), None);
    }

    #[test]
    fn test_serde_string_form() {
        let id = ChainId::new("eip155", "137");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"eip155:137\"");
        let back: ChainId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
